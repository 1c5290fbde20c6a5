//! Centralized path resolution for voidctl
//!
//! # Environment Variables
//!
//! - `VOIDCTL_CONFIG_DIR` - Override config directory (e.g., `~/dotfiles/voidctl`)
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `VOIDCTL_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/voidctl` (if set)
//! 3. `~/.config/voidctl`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "VOIDCTL_CONFIG_DIR";

/// Name of the config file inside the config directory
pub const CONFIG_FILE: &str = "config.toml";

/// Get the voidctl config directory path
pub fn config_dir() -> Result<PathBuf> {
    // 1. Check environment variable override
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    // 2. Check XDG_CONFIG_HOME
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        let path = PathBuf::from(xdg_config).join("voidctl");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    // 3. Default: ~/.config/voidctl
    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join("voidctl");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Path of the config file, honoring an explicit `--config` override
pub fn config_file(explicit: Option<&std::path::Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(expand(&path.to_string_lossy())),
        None => Ok(config_dir()?.join(CONFIG_FILE)),
    }
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables are left as written.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::path::Path;
    use std::sync::Mutex;

    /// Serializes tests that touch the process environment
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Helper to run a test with temporary env vars (`None` removes)
    fn with_env<F, R>(vars: &[(&str, Option<&str>)], f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _lock = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let originals: Vec<_> = vars.iter().map(|(k, _)| (*k, env::var(k).ok())).collect();
        for (key, value) in vars {
            // SAFETY: env access in this module is serialized by ENV_LOCK
            match value {
                Some(v) => unsafe { env::set_var(key, v) },
                None => unsafe { env::remove_var(key) },
            }
        }
        let result = f();
        for (key, value) in originals {
            // SAFETY: as above
            match value {
                Some(v) => unsafe { env::set_var(key, v) },
                None => unsafe { env::remove_var(key) },
            }
        }
        result
    }

    #[test]
    fn test_config_dir_env_override() {
        with_env(&[(ENV_CONFIG_DIR, Some("/custom/config/path"))], || {
            assert_eq!(config_dir().unwrap(), PathBuf::from("/custom/config/path"));
        });
    }

    #[test]
    fn test_config_dir_env_override_with_tilde() {
        let home = dirs::home_dir().unwrap();
        with_env(&[(ENV_CONFIG_DIR, Some("~/dotfiles/voidctl"))], || {
            assert_eq!(config_dir().unwrap(), home.join("dotfiles").join("voidctl"));
        });
    }

    #[test]
    fn test_xdg_config_home() {
        with_env(
            &[
                (ENV_CONFIG_DIR, None),
                ("XDG_CONFIG_HOME", Some("/tmp/xdg-config-test")),
            ],
            || {
                assert_eq!(
                    config_dir().unwrap(),
                    PathBuf::from("/tmp/xdg-config-test/voidctl")
                );
            },
        );
    }

    #[test]
    fn test_default_config_dir() {
        let home = dirs::home_dir().unwrap();
        with_env(&[(ENV_CONFIG_DIR, None), ("XDG_CONFIG_HOME", None)], || {
            assert_eq!(config_dir().unwrap(), home.join(".config").join("voidctl"));
        });
    }

    #[test]
    fn test_explicit_config_file_wins() {
        let path = config_file(Some(Path::new("/etc/voidctl.toml"))).unwrap();
        assert_eq!(path, PathBuf::from("/etc/voidctl.toml"));
    }

    #[test]
    fn test_config_file_in_dir() {
        with_env(&[(ENV_CONFIG_DIR, Some("/custom"))], || {
            assert_eq!(
                config_file(None).unwrap(),
                PathBuf::from("/custom/config.toml")
            );
        });
    }

    #[test]
    fn test_expand_absolute() {
        assert_eq!(expand("/absolute/path"), PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_expand_unknown_env_var_unchanged() {
        let result = expand("/path/$NONEXISTENT_VAR_12345/file");
        assert_eq!(result, PathBuf::from("/path/$NONEXISTENT_VAR_12345/file"));
    }
}
