//! The inhibit lock object.

use super::pipe::{self, FifoOps, NodeId, SystemFifo};
use super::types::{Identity, LockState};
use crate::error::{InhibitError, Result};
use crate::event_loop::{EventLoop, WatchId};
use chrono::{DateTime, Utc};
use std::cell::Cell;
use std::fmt;
use std::ops::ControlFlow;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// A single inhibit lock.
///
/// The lock is held for as long as the client keeps the descriptor returned
/// by [`create_lock`](Self::create_lock) open. Dropping the lock closes the
/// monitoring end, unregisters the hang-up watch and removes the FIFO node,
/// whatever state the lock reached.
pub struct InhibitLock {
    base_dir: PathBuf,
    event_loop: EventLoop,
    ops: Box<dyn FifoOps>,

    identity: Option<Identity>,
    pipe_path: Option<PathBuf>,

    /// Read end of the FIFO. `None` until granted and after release.
    monitor: Option<Rc<OwnedFd>>,
    /// The node this lock created; only that node is removed on release.
    node: Option<NodeId>,
    watch: Option<WatchId>,
    /// Set by the hang-up callback.
    hung_up: Rc<Cell<bool>>,

    state: LockState,
    granted_at: Option<DateTime<Utc>>,
}

impl InhibitLock {
    /// Create an uninitialized lock whose pipe will live in `base_dir`.
    pub fn new<P: AsRef<Path>>(base_dir: P, event_loop: EventLoop) -> Self {
        Self::with_ops(base_dir, event_loop, Box::new(SystemFifo))
    }

    /// Create an uninitialized lock using custom FIFO primitives.
    pub fn with_ops<P: AsRef<Path>>(
        base_dir: P,
        event_loop: EventLoop,
        ops: Box<dyn FifoOps>,
    ) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            event_loop,
            ops,
            identity: None,
            pipe_path: None,
            monitor: None,
            node: None,
            watch: None,
            hung_up: Rc::new(Cell::new(false)),
            state: LockState::Uninitialized,
            granted_at: None,
        }
    }

    /// Create and grant a lock in one step.
    ///
    /// Returns the lock together with the client handle.
    pub fn acquire<P: AsRef<Path>>(
        base_dir: P,
        event_loop: EventLoop,
        who: &str,
        what: &str,
        why: &str,
    ) -> Result<(Self, OwnedFd)> {
        let mut lock = Self::new(base_dir, event_loop);
        let client = lock.create_lock(who, what, why)?;
        Ok((lock, client))
    }

    /// Record the lock holder and materialize the liveness channel.
    ///
    /// On success the write end of the FIFO is returned and ownership passes
    /// to the caller: the lock is held until every copy of it is closed.
    ///
    /// # Errors
    ///
    /// * `InvalidInput` - an empty field, a `who` that is not a plain file
    ///   name, or a lock that is not freshly constructed
    /// * `OutOfMemory` - the pipe path could not be allocated
    /// * `GeneralFailure` - creating the directory, the FIFO, or one of its
    ///   ends failed; a FIFO already present at the path is left untouched
    ///
    /// After an error the lock is in [`LockState::Failed`] and holds nothing.
    pub fn create_lock(&mut self, who: &str, what: &str, why: &str) -> Result<OwnedFd> {
        if self.state != LockState::Uninitialized {
            tracing::warn!(
                state = %self.state(),
                "attempted to create an inhibit lock on an already used object"
            );
            return Err(InhibitError::InvalidInput(format!(
                "inhibit lock is already {}",
                self.state()
            )));
        }

        match self.grant(who, what, why) {
            Ok(client) => Ok(client),
            Err(e) => {
                self.identity = None;
                self.pipe_path = None;
                self.state = LockState::Failed;
                Err(e)
            }
        }
    }

    fn grant(&mut self, who: &str, what: &str, why: &str) -> Result<OwnedFd> {
        if who.is_empty() || what.is_empty() || why.is_empty() {
            tracing::warn!("who, what, and why are mandatory for inhibit locks");
            return Err(InhibitError::InvalidInput(
                "who, what, and why are mandatory for inhibit locks".to_string(),
            ));
        }
        validate_who(who)?;

        let path = pipe_path_for(&self.base_dir, who)?;
        self.identity = Some(Identity {
            who: who.to_string(),
            what: what.to_string(),
            why: why.to_string(),
        });
        self.pipe_path = Some(path.clone());

        pipe::ensure_base_directory(&self.base_dir)?;

        let hung_up = Rc::clone(&self.hung_up);
        let holder = who.to_string();
        let on_hangup = move |_| {
            tracing::info!(who = %holder, "inhibitor released: all client handles closed");
            hung_up.set(true);
            ControlFlow::Break(())
        };
        let channel =
            pipe::create_named_pipe(self.ops.as_ref(), &path, &self.event_loop, on_hangup)?;

        self.monitor = Some(channel.monitor);
        self.node = Some(channel.node);
        self.watch = Some(channel.watch);
        self.state = LockState::Granted;
        self.granted_at = Some(Utc::now());

        tracing::info!(who, what, why, path = %path.display(), "inhibitor granted");
        Ok(channel.client)
    }

    /// Release the lock from the owner's side.
    ///
    /// Closes the monitoring end, unregisters the watch and removes the FIFO
    /// node if it is still the one this lock created. Safe to call any number
    /// of times, in any state.
    pub fn release(&mut self) {
        if let Some(watch) = self.watch.take() {
            self.event_loop.remove_watch(watch);
        }

        // Compared while the monitoring end still pins the inode.
        if self.state == LockState::Granted {
            if let (Some(path), Some(node)) = (&self.pipe_path, self.node) {
                pipe::remove_own_node(self.ops.as_ref(), path, node);
            }
            self.state = LockState::Released;
            if let Some(identity) = &self.identity {
                tracing::debug!(who = %identity.who, "inhibitor torn down");
            }
        }

        // The watch held the only other reference; this closes the descriptor.
        self.monitor = None;
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LockState {
        if self.state == LockState::Granted && self.hung_up.get() {
            LockState::Released
        } else {
            self.state
        }
    }

    /// Whether the lock has been released by its client or its owner.
    pub fn is_released(&self) -> bool {
        self.state() == LockState::Released
    }

    /// The lock holder, once recorded.
    pub fn who(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.who.as_str())
    }

    /// The inhibited transitions, once recorded.
    pub fn what(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.what.as_str())
    }

    /// The justification, once recorded.
    pub fn why(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.why.as_str())
    }

    /// Location of the FIFO node, once derived.
    pub fn pipe_path(&self) -> Option<&Path> {
        self.pipe_path.as_deref()
    }

    /// When the lock was granted.
    pub fn granted_at(&self) -> Option<DateTime<Utc>> {
        self.granted_at
    }

    /// The monitoring end, while it is open.
    pub fn monitor_fd(&self) -> Option<BorrowedFd<'_>> {
        self.monitor.as_deref().map(|fd| fd.as_fd())
    }
}

impl Drop for InhibitLock {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for InhibitLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InhibitLock")
            .field("who", &self.who())
            .field("what", &self.what())
            .field("why", &self.why())
            .field("pipe_path", &self.pipe_path)
            .field("state", &self.state())
            .field("watch", &self.watch)
            .finish()
    }
}

/// Reject identities that would escape the lock directory.
pub(crate) fn validate_who(who: &str) -> Result<()> {
    if who == "." || who == ".." || who.contains('/') || who.contains('\0') {
        return Err(InhibitError::InvalidInput(format!(
            "who must be a plain file name, got '{}'",
            who.escape_default()
        )));
    }
    Ok(())
}

/// `<base_dir>/<who>`, with the allocation failure surfaced as an error.
fn pipe_path_for(base_dir: &Path, who: &str) -> Result<PathBuf> {
    let mut path = PathBuf::new();
    path.try_reserve(base_dir.as_os_str().len() + 1 + who.len())
        .map_err(|e| {
            tracing::warn!("failed to allocate memory for inhibit pipe path");
            InhibitError::OutOfMemory(format!("inhibit pipe path for '{}': {}", who, e))
        })?;
    path.push(base_dir);
    path.push(who);
    Ok(path)
}
