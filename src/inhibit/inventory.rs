//! Listing and clearing inhibitor nodes on disk.
//!
//! The lock directory only ever contains FIFOs. A FIFO whose monitoring end
//! is open belongs to a live lock; one without a reader was left behind by a
//! daemon that died without cleaning up, and blocks any new lock for the
//! same `who` until it is cleared.

use super::lock::validate_who;
use super::pipe::{FifoOps, SystemFifo};
use crate::error::{InhibitError, Result};
use chrono::{DateTime, Duration, Utc};
use nix::errno::Errno;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::io;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};

/// Whether a node still has a monitoring end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Liveness {
    /// A reader holds the monitoring end.
    Live,
    /// Nobody is monitoring the node.
    Stale,
    /// The probe could not open the node (e.g. permission denied).
    Unknown,
}

impl fmt::Display for Liveness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Liveness::Live => "live",
            Liveness::Stale => "STALE",
            Liveness::Unknown => "unknown",
        })
    }
}

/// An inhibitor node found in the lock directory.
#[derive(Debug, Clone, Serialize)]
pub struct InhibitorEntry {
    /// The lock holder (the node's file name).
    pub who: String,

    /// The node path.
    pub path: PathBuf,

    /// Last modification of the node, which is its creation for a FIFO
    /// nobody has written to.
    pub created_at: DateTime<Utc>,

    /// Result of the liveness probe.
    pub liveness: Liveness,
}

impl InhibitorEntry {
    /// Age of the node.
    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.created_at)
    }

    /// Format the age as a human-readable string.
    pub fn age_string(&self) -> String {
        let age = self.age();
        let minutes = age.num_minutes();
        let hours = age.num_hours();
        let days = age.num_days();

        if days > 0 {
            format!("{}d {}h", days, hours % 24)
        } else if hours > 0 {
            format!("{}h {}m", hours, minutes % 60)
        } else {
            format!("{}m", minutes)
        }
    }

    pub fn is_stale(&self) -> bool {
        self.liveness == Liveness::Stale
    }
}

impl fmt::Display for InhibitorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (age: {}, {})",
            self.who,
            self.age_string(),
            self.liveness
        )
    }
}

/// List every inhibitor node in `base_dir`, sorted by `who`.
///
/// A missing directory means no inhibitors. Entries that are not FIFOs are
/// ignored.
pub fn list_inhibitors(base_dir: &Path) -> Result<Vec<InhibitorEntry>> {
    let mut entries = Vec::new();

    if !base_dir.exists() {
        return Ok(entries);
    }

    let dir = fs::read_dir(base_dir).map_err(|e| {
        InhibitError::general(
            format!("failed to read inhibit directory '{}'", base_dir.display()),
            e,
        )
    })?;

    for entry in dir {
        let entry = entry.map_err(|e| {
            InhibitError::general("failed to read inhibit directory entry", e)
        })?;

        let path = entry.path();
        let Some(who) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };

        // Nodes can disappear between read_dir and inspection.
        let Some(found) = inspect(&path, who)? else {
            continue;
        };
        entries.push(found);
    }

    entries.sort_by(|a, b| a.who.cmp(&b.who));

    Ok(entries)
}

/// Remove the node for `who`.
///
/// Stale nodes are always removed. A live node is only removed with
/// `force`; its holder keeps the descriptors but the lock is no longer
/// visible on disk.
pub fn clear_inhibitor(base_dir: &Path, who: &str, force: bool) -> Result<InhibitorEntry> {
    if who.is_empty() {
        return Err(InhibitError::InvalidInput(
            "inhibitor name must not be empty".to_string(),
        ));
    }
    validate_who(who)?;
    let path = base_dir.join(who);

    let Some(found) = inspect(&path, who.to_string())? else {
        return Err(InhibitError::InvalidInput(format!(
            "inhibitor '{}' does not exist at: {}",
            who,
            path.display()
        )));
    };

    if found.liveness != Liveness::Stale && !force {
        return Err(InhibitError::InvalidInput(format!(
            "inhibitor '{}' is {}; refusing to clear it without --force",
            who, found.liveness
        )));
    }

    SystemFifo.remove(&path).map_err(|e| {
        InhibitError::general(format!("failed to clear inhibitor '{}'", path.display()), e)
    })?;
    tracing::info!(who, liveness = %found.liveness, "cleared inhibitor node");

    Ok(found)
}

/// Stat and probe one node. `Ok(None)` when it is gone or not a FIFO.
fn inspect(path: &Path, who: String) -> Result<Option<InhibitorEntry>> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(InhibitError::general(
                format!("failed to stat '{}'", path.display()),
                e,
            ));
        }
    };

    if !metadata.file_type().is_fifo() {
        return Ok(None);
    }

    let created_at = metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());

    Ok(Some(InhibitorEntry {
        who,
        path: path.to_path_buf(),
        created_at,
        liveness: probe(path),
    }))
}

/// Open the write end without blocking: `ENXIO` means no reader exists.
///
/// The probe's own write end is closed immediately. While a client holds its
/// copy this does not produce a hang-up on the monitoring end.
fn probe(path: &Path) -> Liveness {
    match SystemFifo.open_client(path) {
        Ok(_) => Liveness::Live,
        Err(e) if e.raw_os_error() == Some(Errno::ENXIO as i32) => Liveness::Stale,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "liveness probe failed");
            Liveness::Unknown
        }
    }
}
