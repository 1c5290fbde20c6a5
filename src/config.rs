//! Operator configuration (`config.toml`)
//!
//! Every field has a default, so a missing file or a partial one is valid.

use anyhow::{Context, Result};
use runitkit::{ServiceDirs, Supervisor};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use xbpskit::{NameParser, Tools};

use crate::paths;
use crate::sudo::BrokerKind;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub elevation: ElevationConfig,
    pub packages: PackagesConfig,
    pub services: ServicesConfig,
    pub timeouts: TimeoutsConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElevationConfig {
    /// How privileged commands are run
    pub broker: BrokerKind,
    /// Environment variables passed through to privileged commands
    pub pass_env: Vec<String>,
}

impl Default for ElevationConfig {
    fn default() -> Self {
        Self {
            broker: BrokerKind::Pkexec,
            pass_env: vec!["DISPLAY".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagesConfig {
    pub query_tool: String,
    pub install_tool: String,
    pub remove_tool: String,
    pub name_parser: NameParser,
    /// Packages that should be installed
    pub install: Vec<String>,
    /// Packages that should be removed
    pub remove: Vec<String>,
}

impl Default for PackagesConfig {
    fn default() -> Self {
        let tools = Tools::default();
        Self {
            query_tool: tools.query,
            install_tool: tools.install,
            remove_tool: tools.remove,
            name_parser: NameParser::default(),
            install: Vec::new(),
            remove: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    pub available_dir: String,
    pub enabled_dir: String,
    pub supervisor: String,
    /// Services that should be enabled
    pub enabled: Vec<String>,
    /// Services that should be disabled
    pub disabled: Vec<String>,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            available_dir: runitkit::layout::DEFAULT_AVAILABLE_DIR.to_string(),
            enabled_dir: runitkit::layout::DEFAULT_ENABLED_DIR.to_string(),
            supervisor: Supervisor::default().program,
            enabled: Vec::new(),
            disabled: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    /// Deadline for read-only queries (seconds, 0 = none)
    pub query_secs: u64,
    /// Deadline for each privileged command (seconds, 0 = none)
    pub action_secs: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            query_secs: 60,
            action_secs: 1800,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Quiet period before a typed search runs in the shell
    pub debounce_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { debounce_ms: 300 }
    }
}

fn secs(value: u64) -> Option<Duration> {
    (value > 0).then_some(Duration::from_secs(value))
}

impl TimeoutsConfig {
    pub fn query(&self) -> Option<Duration> {
        secs(self.query_secs)
    }

    pub fn action(&self) -> Option<Duration> {
        secs(self.action_secs)
    }
}

impl Config {
    /// Load from `path`, or defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Load from `--config` or the default location
    pub fn load_from(explicit: Option<&Path>) -> Result<(Self, PathBuf)> {
        let path = paths::config_file(explicit)?;
        let config = Self::load(&path)?;
        for warning in config.validate() {
            log::warn!("{warning}");
        }
        Ok((config, path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Problems that don't prevent running but probably aren't intended
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        for name in self.packages.install.iter().filter(|n| self.packages.remove.contains(n)) {
            warnings.push(format!(
                "package '{name}' is in both packages.install and packages.remove"
            ));
        }
        for name in self.services.enabled.iter().filter(|n| self.services.disabled.contains(n)) {
            warnings.push(format!(
                "service '{name}' is in both services.enabled and services.disabled"
            ));
        }
        for name in self.packages.install.iter().chain(&self.packages.remove) {
            if name.trim().is_empty() || name.contains(char::is_whitespace) {
                warnings.push(format!("invalid package name '{name}'"));
            }
        }
        if self.elevation.broker == BrokerKind::None {
            warnings.push(
                "elevation.broker is 'none'; privileged commands will run as the current user"
                    .to_string(),
            );
        }

        warnings
    }

    pub fn tools(&self) -> Tools {
        Tools {
            query: self.packages.query_tool.clone(),
            install: self.packages.install_tool.clone(),
            remove: self.packages.remove_tool.clone(),
        }
    }

    pub fn service_dirs(&self) -> ServiceDirs {
        ServiceDirs::new(
            paths::expand(&self.services.available_dir),
            paths::expand(&self.services.enabled_dir),
        )
    }

    pub fn supervisor(&self) -> Supervisor {
        Supervisor {
            program: self.services.supervisor.clone(),
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.search.debounce_ms)
    }
}
