//! # execkit
//!
//! Run external commands without letting a hung child freeze the caller.
//!
//! Every invocation:
//! - streams stdout and stderr line by line as the child produces them
//! - can carry a deadline, after which the child's process group is terminated
//! - observes a [`CancelToken`] that another thread may trip at any time
//!
//! ## Example
//!
//! ```no_run
//! use execkit::{CancelToken, Invocation, stream};
//! use std::time::Duration;
//!
//! let inv = Invocation::new("xbps-query")
//!     .arg("-l")
//!     .timeout(Duration::from_secs(60));
//!
//! let exit = stream(&inv, &CancelToken::new(), &mut |line| println!("{line}"))
//!     .expect("failed to launch");
//! assert!(exit.is_success());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Shared cancellation flag.
pub mod cancel;
/// Error types for process execution.
pub mod error;
/// Invocation description and the streaming/capturing runners.
pub mod process;

pub use cancel::CancelToken;
pub use error::{Error, Result};
pub use process::{Captured, Exit, Invocation, Stream, capture, run, stream};
