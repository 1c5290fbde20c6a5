//! Core types for XBPS package management.

use serde::{Deserialize, Serialize};

/// Names of the XBPS executables.
///
/// Overridable so that wrappers (or test doubles) can stand in for the real
/// tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tools {
    /// Query tool (listing and searching)
    pub query: String,
    /// Install tool
    pub install: String,
    /// Remove tool
    pub remove: String,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            query: "xbps-query".to_string(),
            install: "xbps-install".to_string(),
            remove: "xbps-remove".to_string(),
        }
    }
}

/// How a `<name>-<version>` token is split into a package name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameParser {
    /// Name is everything before the first `-`.
    ///
    /// Loses names that contain a dash (`xdg-utils` becomes `xdg`), kept as
    /// the default for compatibility with existing selections.
    #[default]
    Compat,
    /// Name is everything before the last `-` when the remainder looks like
    /// an XBPS version (`<version>_<revision>`); falls back to `Compat`.
    Strict,
}

/// Which way a package action goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Directive {
    /// Install (and sync repositories first)
    Install,
    /// Remove (recursively, with orphaned dependencies)
    Remove,
}

impl std::fmt::Display for Directive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Directive::Install => write!(f, "install"),
            Directive::Remove => write!(f, "remove"),
        }
    }
}

/// A package from `xbps-query -l`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPackage {
    /// Package name
    pub name: String,
    /// Version (with revision), when the token carried one
    pub version: Option<String>,
}

/// A match from `xbps-query -Rs <query>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Package name
    pub name: String,
    /// Version (with revision), when the token carried one
    pub version: Option<String>,
    /// One-line description
    pub description: String,
}
