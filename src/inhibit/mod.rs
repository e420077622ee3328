//! Inhibit locks for inhibitor.
//!
//! An inhibit lock blocks power-state transitions (shutdown, sleep, idle,
//! key handling) for as long as its client wants, without an unlock call.
//!
//! # Liveness Channel
//!
//! Each lock owns a FIFO at `{run_dir}/ConsoleKit/inhibit/{who}`. The daemon
//! keeps the read end (the monitoring end) and registers a hang-up watch on
//! it with the event loop; the write end (the client handle) is handed to the
//! requester. When the client closes every copy of its handle, directly or
//! by exiting, the monitoring end reports hang-up exactly once and the lock
//! counts as released.
//!
//! # Teardown
//!
//! Dropping an [`InhibitLock`] closes the monitoring end, unregisters the
//! watch and removes the FIFO node. Removal failures are logged as warnings
//! and never panic.
//!
//! # Identity
//!
//! `who` doubles as the FIFO's file name, so it must be a plain file name.
//! A second lock for the same `who` fails while the first node exists.

mod inventory;
mod lock;
mod pipe;
mod types;
mod what;


// Re-export public API
pub use inventory::{InhibitorEntry, Liveness, clear_inhibitor, list_inhibitors};
pub use lock::InhibitLock;
pub use pipe::{
    BASE_DIR_MODE, FifoOps, NamedPipe, SystemFifo, create_named_pipe, ensure_base_directory,
};
pub use types::LockState;
pub use what::{InhibitKind, parse_what};
