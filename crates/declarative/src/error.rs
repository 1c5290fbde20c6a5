//! Error taxonomy for reconciliation
//!
//! None of these are fatal to a session: query and filesystem failures
//! degrade to empty results, action failures are recorded per action.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The package query tool was unavailable, failed or timed out
    #[error("package query failed: {0}")]
    QueryFailure(String),

    /// The service definition directory could not be read
    #[error("cannot read services: {0}")]
    FilesystemFailure(String),

    /// An action command failed to launch, exited non-zero, timed out or was
    /// cancelled
    #[error("{action} failed: {reason}")]
    ActionFailure { action: String, reason: String },

    /// The elevation broker declined authorization
    #[error("{action}: authorization denied")]
    ElevationDenied { action: String },

    /// Another apply is still running
    #[error("an apply is already in progress")]
    ApplyInProgress,
}

/// Failure reported by an [`ElevationBroker`](crate::ElevationBroker) when a
/// command did not produce an exit code of its own.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    #[error("failed to launch {program}: {message}")]
    Launch { program: String, message: String },

    #[error("authorization denied")]
    Denied,

    #[error("timed out")]
    TimedOut,

    #[error("cancelled")]
    Cancelled,

    #[error("killed by signal {0}")]
    Signaled(i32),
}

pub type Result<T> = std::result::Result<T, Error>;
