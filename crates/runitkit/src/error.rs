use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading service directories.
#[derive(Debug, Error)]
pub enum Error {
    /// A service root could not be listed
    #[error("cannot read {}: {source}", path.display())]
    Unreadable {
        /// Directory that failed
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },
}

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, Error>;
