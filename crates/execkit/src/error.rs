use thiserror::Error;

/// Errors that prevent a command from producing an [`Exit`](crate::Exit).
///
/// A command that runs and fails is not an error here; its exit is reported
/// through `Exit` so callers can decide what a non-zero code means.
#[derive(Debug, Error)]
pub enum Error {
    /// The program could not be started (missing binary, permissions, ...)
    #[error("failed to launch {program}: {source}")]
    Spawn {
        /// Program that failed to start
        program: String,
        /// Underlying OS error
        source: std::io::Error,
    },

    /// Waiting on or reading from the child failed
    #[error("IO error while running {program}: {source}")]
    Io {
        /// Program being run
        program: String,
        /// Underlying OS error
        source: std::io::Error,
    },
}

impl Error {
    /// Whether the program itself was not found on PATH.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::Spawn { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}

/// Result type for process execution.
pub type Result<T> = std::result::Result<T, Error>;
