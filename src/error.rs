//! Error types for inhibitor.
//!
//! Uses thiserror for derive macros. The three lock-creation variants
//! (`InvalidInput`, `OutOfMemory`, `GeneralFailure`) form the taxonomy every
//! caller of `create_lock` has to handle; the remaining variants only come
//! from the CLI layer.

use crate::exit_codes;
use std::io;
use thiserror::Error;

/// Main error type for inhibitor operations.
#[derive(Error, Debug)]
pub enum InhibitError {
    /// Caller contract violation: missing identity fields, unsafe `who`,
    /// or reuse of an already initialized lock.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A string or path buffer could not be allocated.
    #[error("out of memory: {0}")]
    OutOfMemory(String),

    /// Any OS-level failure while creating the directory, the FIFO node,
    /// or one of its ends.
    #[error("{context}: {source}")]
    GeneralFailure {
        context: String,
        #[source]
        source: io::Error,
    },

    /// Configuration could not be loaded or is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The command run under an inhibit lock failed.
    #[error("command failed: {0}")]
    Command(String),
}

impl InhibitError {
    /// Wrap an OS error with a short description of what was attempted.
    pub fn general(context: impl Into<String>, source: impl Into<io::Error>) -> Self {
        InhibitError::GeneralFailure {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            InhibitError::InvalidInput(_) => exit_codes::INVALID_INPUT,
            InhibitError::Config(_) => exit_codes::INVALID_INPUT,
            InhibitError::GeneralFailure { .. } => exit_codes::GENERAL_FAILURE,
            InhibitError::OutOfMemory(_) => exit_codes::OUT_OF_MEMORY,
            InhibitError::Command(_) => exit_codes::COMMAND_FAILURE,
        }
    }
}

/// Result type alias for inhibitor operations.
pub type Result<T> = std::result::Result<T, InhibitError>;
