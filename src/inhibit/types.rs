//! Lock state and identity definitions.

use std::fmt;

/// Lifecycle state of an [`InhibitLock`](super::InhibitLock).
///
/// ```text
/// Uninitialized --create_lock ok-->   Granted
/// Uninitialized --create_lock err-->  Failed    (terminal)
/// Granted       --client hang-up-->   Released  (terminal)
/// Granted       --release / drop-->   Released  (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// Freshly constructed; `create_lock` has not been called.
    Uninitialized,
    /// The pipe exists and the client end is believed to be open.
    Granted,
    /// `create_lock` failed; the object should be discarded.
    Failed,
    /// The client closed its end or the owner released the lock.
    Released,
}

impl LockState {
    /// Get a lowercase name for this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            LockState::Uninitialized => "uninitialized",
            LockState::Granted => "granted",
            LockState::Failed => "failed",
            LockState::Released => "released",
        }
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity and justification of a lock holder. Set once per lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Identity {
    /// Human-readable requester name; also the FIFO's file name.
    pub who: String,
    /// Colon-separated inhibit kinds, stored opaquely.
    pub what: String,
    /// Free-form justification.
    pub why: String,
}
