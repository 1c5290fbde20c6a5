//! # runitkit
//!
//! Rust library for runit service management as laid out on Void Linux.
//!
//! A service is *available* when its definition directory exists under the
//! available root (`/etc/sv`) and *enabled* when the enabled root
//! (`/var/service`) holds a symlink to it that resolves. Enabling and
//! disabling are expressed as command steps for the caller to run with
//! whatever privileges it needs.
//!
//! ## Example
//!
//! ```no_run
//! use runitkit::ServiceDirs;
//!
//! let dirs = ServiceDirs::default();
//! for name in dirs.list_available().expect("cannot read /etc/sv") {
//!     let mark = if dirs.is_enabled(&name) { "*" } else { " " };
//!     println!("[{mark}] {name}");
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Error types for service directory inspection.
pub mod error;
/// Service directory layout and enablement checks.
pub mod layout;
/// Command steps that toggle services.
pub mod steps;

pub use error::{Error, Result};
pub use layout::{ServiceDirs, ServiceState};
pub use steps::{Step, Supervisor, disable_steps, enable_steps};
