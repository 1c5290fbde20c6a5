//! Error types for XBPS operations.
//!
//! Failed package commands are categorized so callers can tell the user what
//! went wrong and what to try next.

use thiserror::Error;

/// Categories of XBPS failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Repository could not be reached (transient, retryable)
    Network,
    /// Package not found in any repository
    NotFound,
    /// Dependency or file conflict
    Conflict,
    /// Permission denied (not running elevated)
    Permission,
    /// XBPS tools are not installed or not on PATH
    XbpsNotFound,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Short user-facing description.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Repository unreachable",
            Self::NotFound => "Package not found",
            Self::Conflict => "Package conflict",
            Self::Permission => "Permission denied",
            Self::XbpsNotFound => "XBPS not installed",
            Self::Other => "Unexpected error",
        }
    }

    /// Actionable advice for this category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check your network connection and repository mirrors, then retry",
            Self::NotFound => "Verify the package name with `voidctl search`",
            Self::Conflict => "Resolve the conflict by removing or holding the conflicting packages",
            Self::Permission => "Run with an elevation broker (pkexec, sudo or doas) configured",
            Self::XbpsNotFound => "This tool only works on Void Linux with xbps installed",
            Self::Other => "Check the command output above for details",
        }
    }

    /// Categorize the combined output of a failed xbps command.
    pub fn classify(output: &str) -> Self {
        let lower = output.to_lowercase();

        if lower.contains("could not resolve")
            || lower.contains("failed to fetch")
            || lower.contains("connection refused")
            || lower.contains("operation timed out")
            || lower.contains("failed to download")
            || (lower.contains("repository")
                && (lower.contains("unavailable") || lower.contains("not found")))
        {
            return Self::Network;
        }

        if lower.contains("not found in repository pool") || lower.contains("package not found") {
            return Self::NotFound;
        }

        if lower.contains("conflict")
            || lower.contains("breaks installed pkg")
            || lower.contains("unresolved")
            || lower.contains("dependency")
        {
            return Self::Conflict;
        }

        if lower.contains("permission denied")
            || lower.contains("operation not permitted")
            || lower.contains("must be root")
        {
            return Self::Permission;
        }

        Self::Other
    }
}

/// Errors that can occur while querying XBPS.
#[derive(Debug, Error)]
pub enum Error {
    /// A tool could not be found on PATH
    #[error("{tool} not found; is this a Void Linux system?")]
    XbpsNotFound {
        /// The missing executable
        tool: String,
    },

    /// A tool ran and exited unsuccessfully
    #[error("command failed: {message}")]
    CommandFailed {
        /// What failed
        message: String,
        /// Standard error of the failed command
        stderr: String,
    },

    /// A query exceeded its deadline
    #[error("{tool} timed out")]
    TimedOut {
        /// The tool that hung
        tool: String,
    },

    /// The query was cancelled by the caller
    #[error("query cancelled")]
    Cancelled,

    /// Launching or reading from a tool failed
    #[error(transparent)]
    Io(#[from] execkit::Error),
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::XbpsNotFound { .. } => ErrorCategory::XbpsNotFound,
            Error::CommandFailed { stderr, .. } => ErrorCategory::classify(stderr),
            Error::TimedOut { .. } => ErrorCategory::Network,
            _ => ErrorCategory::Other,
        }
    }
}

/// Result type for XBPS operations.
pub type Result<T> = std::result::Result<T, Error>;
