//! # xbpskit
//!
//! Rust library for the XBPS package manager (Void Linux).
//!
//! This crate provides:
//! - Parsers for `xbps-query -l` and `xbps-query -Rs` output
//! - Argument builders for `xbps-install` / `xbps-remove`
//! - A [`Backend`](backend::Backend) trait with a real CLI implementation
//! - Classification of failed package commands into actionable categories
//!
//! ## Example
//!
//! ```no_run
//! use xbpskit::backend::{Backend, xbps::XbpsBackend};
//! use xbpskit::{NameParser, Tools};
//!
//! let backend = XbpsBackend::new(Tools::default(), NameParser::Compat);
//!
//! for hit in backend.search("htop").expect("search failed") {
//!     println!("{} - {}", hit.name, hit.description);
//! }
//!
//! let installed = backend.installed_names().expect("listing failed");
//! println!("{} packages installed", installed.len());
//! ```
//!
//! Mutating commands are only *built* here (see [`command`]); running them
//! with elevated privileges is the caller's job.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod command;
pub mod error;
pub mod parse;
pub mod types;

pub use error::{Error, ErrorCategory, Result};
pub use types::{Directive, InstalledPackage, NameParser, SearchHit, Tools};
