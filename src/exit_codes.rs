//! Exit code constants for the inhibitor CLI.
//!
//! - 0: Success
//! - 1: Invalid input (bad arguments, bad configuration)
//! - 2: General failure (directory, pipe, or descriptor errors)
//! - 3: Out of memory
//! - 4: The command run under the lock failed

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// Invalid input: missing or unsafe identity fields, bad configuration.
pub const INVALID_INPUT: i32 = 1;

/// General failure: an OS-level operation on the lock directory or pipe failed.
pub const GENERAL_FAILURE: i32 = 2;

/// Allocation failure while building the pipe path.
pub const OUT_OF_MEMORY: i32 = 3;

/// The held command could not be started or exited unsuccessfully.
pub const COMMAND_FAILURE: i32 = 4;
