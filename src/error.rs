// src/error.rs

//! Crate-wide error and result types

use thiserror::Error;

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the orchestration core
///
/// Recoverable filesystem problems inside pipeline steps are logged and
/// swallowed at the call site; only conditions that must stop an operation
/// (or the whole command) are represented here.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O failure that a step could not tolerate
    #[error("I/O error: {0}")]
    IoError(String),

    /// Malformed input document or value
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Command arguments rejected before any pipeline ran
    #[error("{0}")]
    InvalidArguments(String),

    /// Exclusive pending-marker lock could not be acquired
    #[error("Lock error: {0}")]
    LockError(String),

    /// Scripting host failed in a way the pipeline cannot recover from
    #[error("Script error: {0}")]
    ScriptError(String),

    /// A package installer requested a reboot and the run is configured
    /// to stop when that happens
    #[error("Reboot required: {0}")]
    RebootRequired(String),

    /// A package operation failed and the command must halt
    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ParseError(err.to_string())
    }
}
