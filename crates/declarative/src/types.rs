//! Core types for package and service reconciliation

use crate::error::BrokerError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Operator intent for a package row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Selection {
    /// No intent; the row is informational
    #[default]
    Unselected,
    /// Package should be installed
    Install,
    /// Package should be removed
    Remove,
}

/// One row of the package table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub name: String,
    pub description: String,
    /// Whether the package was installed at the last snapshot
    pub installed_actual: bool,
    pub selection: Selection,
}

impl PackageRecord {
    /// Create an unselected row
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            installed_actual: false,
            selection: Selection::Unselected,
        }
    }

    /// Whether the row is selected for install
    pub fn is_selected(&self) -> bool {
        self.selection == Selection::Install
    }
}

/// One service; its group in [`DesiredState`](crate::DesiredState) is its desired state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub name: String,
    /// Whether the service was enabled at the last snapshot
    pub enabled_actual: bool,
}

/// A search result as returned by the package query tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageHit {
    pub name: String,
    pub description: String,
}

/// Observed system state. Replaced wholesale on refresh, never edited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub installed_packages: BTreeSet<String>,
    pub enabled_services: BTreeSet<String>,
    /// Service definitions, sorted by name
    pub available_services: Vec<String>,
}

impl Snapshot {
    pub fn is_installed(&self, name: &str) -> bool {
        self.installed_packages.contains(name)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled_services.contains(name)
    }
}

/// Kind of a planned action, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Disable,
    Enable,
    Uninstall,
    Install,
}

impl ActionKind {
    /// Progressive verb used for header lines
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Disable => "Disabling",
            Self::Enable => "Enabling",
            Self::Uninstall => "Removing",
            Self::Install => "Installing",
        }
    }

    /// "package" or "service"
    pub fn target_type(&self) -> &'static str {
        match self {
            Self::Disable | Self::Enable => "service",
            Self::Uninstall | Self::Install => "package",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Disable => "disable",
            Self::Enable => "enable",
            Self::Uninstall => "uninstall",
            Self::Install => "install",
        };
        f.write_str(label)
    }
}

/// A single planned change
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum Action {
    Disable(String),
    Enable(String),
    Uninstall(String),
    Install(String),
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Disable(_) => ActionKind::Disable,
            Self::Enable(_) => ActionKind::Enable,
            Self::Uninstall(_) => ActionKind::Uninstall,
            Self::Install(_) => ActionKind::Install,
        }
    }

    /// Package or service name the action targets
    pub fn name(&self) -> &str {
        match self {
            Self::Disable(name)
            | Self::Enable(name)
            | Self::Uninstall(name)
            | Self::Install(name) => name,
        }
    }

    /// Header line announcing the action, e.g. `Disabling: sshd`
    pub fn header(&self) -> String {
        format!("{}: {}", self.kind().verb(), self.name())
    }

    /// If `snapshot` already satisfies the action, the message explaining why
    /// it is skipped.
    pub fn redundancy(&self, snapshot: &Snapshot) -> Option<String> {
        let name = self.name();
        let reason = match self {
            Self::Install(_) if snapshot.is_installed(name) => "already installed",
            Self::Uninstall(_) if !snapshot.is_installed(name) => "not installed",
            Self::Enable(_) if snapshot.is_enabled(name) => "already enabled",
            Self::Disable(_) if !snapshot.is_enabled(name) => "not enabled",
            _ => return None,
        };
        Some(format!("{name} {reason}, skipping."))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.name())
    }
}

/// Ordered, duplicate-free set of changes that moves actual state to desired
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPlan {
    pub to_install: Vec<String>,
    pub to_uninstall: Vec<String>,
    pub to_disable: Vec<String>,
    pub to_enable: Vec<String>,
}

impl ActionPlan {
    /// All actions in execution order: disable, enable, uninstall, install
    pub fn actions(&self) -> Vec<Action> {
        let disables = self.to_disable.iter().cloned().map(Action::Disable);
        let enables = self.to_enable.iter().cloned().map(Action::Enable);
        let uninstalls = self.to_uninstall.iter().cloned().map(Action::Uninstall);
        let installs = self.to_install.iter().cloned().map(Action::Install);

        disables
            .chain(enables)
            .chain(uninstalls)
            .chain(installs)
            .collect()
    }

    pub fn total(&self) -> usize {
        self.to_install.len() + self.to_uninstall.len() + self.to_disable.len() + self.to_enable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Why an action did not succeed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "detail")]
pub enum Failure {
    /// The command exited non-zero
    ExitCode(i32),
    /// The command could not be started
    Launch(String),
    /// The elevation broker refused authorization
    Denied,
    /// The command exceeded its deadline
    TimedOut,
    /// The apply was cancelled
    Cancelled,
    /// The command was killed by a signal
    Signaled(i32),
}

impl From<BrokerError> for Failure {
    fn from(err: BrokerError) -> Self {
        match err {
            BrokerError::Launch { program, message } => Self::Launch(format!("{program}: {message}")),
            BrokerError::Denied => Self::Denied,
            BrokerError::TimedOut => Self::TimedOut,
            BrokerError::Cancelled => Self::Cancelled,
            BrokerError::Signaled(signal) => Self::Signaled(signal),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExitCode(code) => write!(f, "exit code {code}"),
            Self::Launch(message) => write!(f, "failed to launch {message}"),
            Self::Denied => write!(f, "authorization denied"),
            Self::TimedOut => write!(f, "timed out"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Signaled(signal) => write!(f, "killed by signal {signal}"),
        }
    }
}

/// Outcome of one action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub action: Action,
    /// Exit code of the last step run; `None` if no step produced one
    pub exit_code: Option<i32>,
    /// Every line emitted for this action, in order
    pub output_lines: Vec<String>,
    pub succeeded: bool,
    /// The action was redundant against the latest snapshot and not run
    pub skipped: bool,
    pub failure: Option<Failure>,
}

impl ExecutionResult {
    /// A redundant action that was not run
    pub fn skipped(action: Action, message: String) -> Self {
        Self {
            action,
            exit_code: None,
            output_lines: vec![message],
            succeeded: true,
            skipped: true,
            failure: None,
        }
    }

    /// An action that was never started because the apply was cancelled
    pub fn cancelled(action: Action) -> Self {
        Self {
            action,
            exit_code: None,
            output_lines: Vec::new(),
            succeeded: false,
            skipped: false,
            failure: Some(Failure::Cancelled),
        }
    }

    /// The taxonomy error for a failed result
    pub fn error(&self) -> Option<crate::Error> {
        let failure = self.failure.as_ref()?;
        Some(match failure {
            Failure::Denied => crate::Error::ElevationDenied {
                action: self.action.to_string(),
            },
            other => crate::Error::ActionFailure {
                action: self.action.to_string(),
                reason: other.to_string(),
            },
        })
    }
}

/// Counts over a batch of results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Actions that failed, in execution order
    pub failures: Vec<Action>,
}

impl ExecuteSummary {
    /// Build a summary from results
    pub fn from_results(results: &[ExecutionResult]) -> Self {
        let mut summary = Self::default();
        for result in results {
            summary.add_result(result);
        }
        summary
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ExecutionResult) {
        if result.skipped {
            self.skipped += 1;
        } else if result.succeeded {
            self.succeeded += 1;
        } else {
            self.failed += 1;
            self.failures.push(result.action.clone());
        }
    }

    /// Total number of actions processed
    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// The closing line written to the output sink
    pub fn done_line(&self) -> String {
        format!(
            "Done: {} succeeded, {} failed, {} skipped.",
            self.succeeded, self.failed, self.skipped
        )
    }
}

/// Options for execution
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Don't run commands, just show what would run
    pub dry_run: bool,
}

/// One command to run through the elevation broker
///
/// A best-effort step that exits non-zero is reported but does not stop the
/// steps after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub argv: Vec<String>,
    #[serde(default)]
    pub best_effort: bool,
}

impl CommandRequest {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            best_effort: false,
        }
    }

    /// Mark the step as best-effort
    pub fn best_effort(mut self) -> Self {
        self.best_effort = true;
        self
    }
}

impl fmt::Display for CommandRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.argv.join(" "))
    }
}
