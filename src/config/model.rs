//! Config struct definition and default implementation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Location of the lock directory below the run-time directory.
pub const INHIBIT_SUBDIR: &str = "ConsoleKit/inhibit";

/// Configuration for inhibitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the volatile run-time filesystem (default: "/run").
    ///
    /// Locks live in `{run_dir}/ConsoleKit/inhibit/`.
    #[serde(default = "default_run_dir")]
    pub run_dir: PathBuf,

    /// Event-loop poll timeout in milliseconds used while waiting for a
    /// held lock to be released.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            run_dir: default_run_dir(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Config {
    /// Build a config rooted at `run_dir` with every other field defaulted.
    pub fn with_run_dir<P: AsRef<Path>>(run_dir: P) -> Self {
        Self {
            run_dir: run_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// The directory that holds one FIFO node per inhibit lock.
    pub fn base_dir(&self) -> PathBuf {
        self.run_dir.join(INHIBIT_SUBDIR)
    }
}

fn default_run_dir() -> PathBuf {
    PathBuf::from("/run")
}

fn default_poll_interval_ms() -> u16 {
    500
}
