use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Default location of service definitions.
pub const DEFAULT_AVAILABLE_DIR: &str = "/etc/sv";

/// Default location of enabled service links.
pub const DEFAULT_ENABLED_DIR: &str = "/var/service";

/// The two directories runit services live in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceDirs {
    /// Directory holding one subdirectory per service definition
    pub available: PathBuf,
    /// Directory holding one symlink per enabled service
    pub enabled: PathBuf,
}

impl Default for ServiceDirs {
    fn default() -> Self {
        Self {
            available: PathBuf::from(DEFAULT_AVAILABLE_DIR),
            enabled: PathBuf::from(DEFAULT_ENABLED_DIR),
        }
    }
}

/// Result of a full scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceState {
    /// Every service with a definition directory
    pub available: BTreeSet<String>,
    /// Available services that are currently enabled
    pub enabled: BTreeSet<String>,
}

impl ServiceDirs {
    /// Use custom roots (tests, alternate runsvdir layouts).
    pub fn new(available: impl Into<PathBuf>, enabled: impl Into<PathBuf>) -> Self {
        Self {
            available: available.into(),
            enabled: enabled.into(),
        }
    }

    /// Where the definition of `name` lives.
    pub fn definition_path(&self, name: &str) -> PathBuf {
        self.available.join(name)
    }

    /// Where the enable link for `name` lives.
    pub fn link_path(&self, name: &str) -> PathBuf {
        self.enabled.join(name)
    }

    /// Names of all service definitions, sorted.
    ///
    /// Only directories count (symlinks to directories included); plain
    /// files in the root are ignored.
    pub fn list_available(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();

        for entry in WalkDir::new(&self.available).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| unreadable(&self.available, e))?;
            if !entry.path().is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            } else {
                log::debug!("Skipping non-UTF-8 service name: {}", entry.path().display());
            }
        }

        names.sort();
        Ok(names)
    }

    /// Whether `name` is enabled.
    ///
    /// True only when the enable entry is a symlink and its target resolves.
    /// A dangling link or a plain directory does not count.
    pub fn is_enabled(&self, name: &str) -> bool {
        let link = self.link_path(name);
        let is_link = link
            .symlink_metadata()
            .is_ok_and(|meta| meta.file_type().is_symlink());
        is_link && link.exists()
    }

    /// List available services and check each one.
    pub fn scan(&self) -> Result<ServiceState> {
        let available: BTreeSet<String> = self.list_available()?.into_iter().collect();
        let enabled = available
            .iter()
            .filter(|name| self.is_enabled(name))
            .cloned()
            .collect();
        Ok(ServiceState { available, enabled })
    }
}

fn unreadable(root: &Path, err: walkdir::Error) -> Error {
    let path = err.path().unwrap_or(root).to_path_buf();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
    Error::Unreadable { path, source }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    fn layout() -> (TempDir, ServiceDirs) {
        let tmp = TempDir::new().unwrap();
        let dirs = ServiceDirs::new(tmp.path().join("sv"), tmp.path().join("service"));
        fs::create_dir(&dirs.available).unwrap();
        fs::create_dir(&dirs.enabled).unwrap();
        for name in ["sshd", "cron", "dbus"] {
            fs::create_dir(dirs.definition_path(name)).unwrap();
        }
        (tmp, dirs)
    }

    #[test]
    fn list_available_is_sorted_directories_only() {
        let (_tmp, dirs) = layout();
        fs::write(dirs.available.join("README"), "not a service").unwrap();

        assert_eq!(dirs.list_available().unwrap(), vec!["cron", "dbus", "sshd"]);
    }

    #[test]
    fn list_available_missing_root_errors() {
        let dirs = ServiceDirs::new("/nonexistent/sv", "/nonexistent/service");
        assert!(matches!(
            dirs.list_available(),
            Err(Error::Unreadable { .. })
        ));
    }

    #[test]
    fn enabled_requires_resolving_symlink() {
        let (_tmp, dirs) = layout();
        symlink(dirs.definition_path("sshd"), dirs.link_path("sshd")).unwrap();
        assert!(dirs.is_enabled("sshd"));
        assert!(!dirs.is_enabled("cron"));
    }

    #[test]
    fn dangling_link_is_not_enabled() {
        let (_tmp, dirs) = layout();
        symlink(dirs.definition_path("gone"), dirs.link_path("gone")).unwrap();
        assert!(!dirs.is_enabled("gone"));
    }

    #[test]
    fn plain_directory_is_not_enabled() {
        let (_tmp, dirs) = layout();
        fs::create_dir(dirs.link_path("dbus")).unwrap();
        assert!(!dirs.is_enabled("dbus"));
    }

    #[test]
    fn scan_collects_enabled_subset() {
        let (_tmp, dirs) = layout();
        symlink(dirs.definition_path("cron"), dirs.link_path("cron")).unwrap();

        let state = dirs.scan().unwrap();
        assert_eq!(state.available.len(), 3);
        assert_eq!(state.enabled, BTreeSet::from(["cron".to_string()]));
    }
}
