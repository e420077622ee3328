use crate::config::Config;
use tempfile::TempDir;

/// A private run-time directory for one test.
///
/// The lock directory below it is not created; that is the job of the code
/// under test.
pub(crate) fn create_test_run_dir() -> (TempDir, Config) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::with_run_dir(temp_dir.path());
    (temp_dir, config)
}

/// A run-time directory that can never be created: its parent is a regular
/// file, so `mkdir` fails with `ENOTDIR` even for root.
pub(crate) fn create_unusable_run_dir() -> (TempDir, Config) {
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("not-a-directory");
    std::fs::write(&blocker, "occupied\n").unwrap();
    let config = Config::with_run_dir(blocker.join("run"));
    (temp_dir, config)
}
