//! The inhibit vocabulary.
//!
//! Locks carry `what` as an opaque string. Consumers that need to decide
//! which transitions are blocked parse it here.

use crate::error::{InhibitError, Result};
use std::fmt;
use std::str::FromStr;

/// A power-state transition (or key handler) that can be inhibited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InhibitKind {
    Shutdown,
    Sleep,
    Idle,
    HandlePowerKey,
    HandleSuspendKey,
    HandleHibernateKey,
}

impl InhibitKind {
    /// Every kind, in canonical order.
    pub const ALL: [InhibitKind; 6] = [
        InhibitKind::Shutdown,
        InhibitKind::Sleep,
        InhibitKind::Idle,
        InhibitKind::HandlePowerKey,
        InhibitKind::HandleSuspendKey,
        InhibitKind::HandleHibernateKey,
    ];

    /// The word used in `what` strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            InhibitKind::Shutdown => "shutdown",
            InhibitKind::Sleep => "sleep",
            InhibitKind::Idle => "idle",
            InhibitKind::HandlePowerKey => "handle-power-key",
            InhibitKind::HandleSuspendKey => "handle-suspend-key",
            InhibitKind::HandleHibernateKey => "handle-hibernate-key",
        }
    }
}

impl fmt::Display for InhibitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InhibitKind {
    type Err = InhibitError;

    fn from_str(s: &str) -> Result<Self> {
        InhibitKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                InhibitError::InvalidInput(format!(
                    "unknown inhibit type '{}' (expected one of: {})",
                    s,
                    InhibitKind::ALL.map(|k| k.as_str()).join(", ")
                ))
            })
    }
}

/// Parse a colon-separated `what` string such as `"shutdown:idle"`.
///
/// Duplicates are dropped, first occurrence wins the position.
pub fn parse_what(what: &str) -> Result<Vec<InhibitKind>> {
    let mut kinds = Vec::new();

    for word in what.split(':') {
        if word.is_empty() {
            return Err(InhibitError::InvalidInput(format!(
                "empty inhibit type in '{}'",
                what
            )));
        }
        let kind: InhibitKind = word.parse()?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }

    Ok(kinds)
}
