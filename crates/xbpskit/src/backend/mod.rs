//! Backend abstraction for XBPS queries.
//!
//! The [`Backend`] trait covers the read-only side of XBPS, allowing the real
//! CLI to be swapped for a mock in tests.

pub mod xbps;

use crate::error::Result;
use crate::types::{InstalledPackage, SearchHit};
use std::collections::BTreeSet;

/// Read-only access to the package database.
pub trait Backend: Send + Sync {
    /// List installed packages.
    fn list_installed(&self) -> Result<Vec<InstalledPackage>>;

    /// Search remote repositories by name or description.
    fn search(&self, query: &str) -> Result<Vec<SearchHit>>;

    /// Names of installed packages.
    fn installed_names(&self) -> Result<BTreeSet<String>> {
        Ok(self
            .list_installed()?
            .into_iter()
            .map(|p| p.name)
            .collect())
    }
}
