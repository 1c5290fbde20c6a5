//! Elevation broker for privileged commands
//!
//! Privileges are never held for the whole process. Each action step is
//! wrapped individually (`pkexec env DISPLAY=:0 xbps-install -Sy htop`), so
//! authorization is asked per command and scoped to it.

use clap::ValueEnum;
use declarative::{BrokerError, CancelToken, CommandRequest, ElevationBroker};
use execkit::{Exit, Invocation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// pkexec exit codes for a dismissed dialog / refused authorization
const PKEXEC_DENIED: [i32; 2] = [126, 127];

/// Mechanism used to run privileged commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BrokerKind {
    /// polkit (graphical or text agent)
    Pkexec,
    Sudo,
    Doas,
    /// Run directly (already root, or testing)
    None,
}

impl BrokerKind {
    fn program(self) -> Option<&'static str> {
        match self {
            Self::Pkexec => Some("pkexec"),
            Self::Sudo => Some("sudo"),
            Self::Doas => Some("doas"),
            Self::None => None,
        }
    }
}

impl fmt::Display for BrokerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program().unwrap_or("none"))
    }
}

/// Runs commands through the configured [`BrokerKind`]
#[derive(Debug, Clone)]
pub struct Broker {
    kind: BrokerKind,
    /// Pass-through variables, resolved from our environment at construction
    env: Vec<(String, String)>,
    timeout: Option<Duration>,
}

impl Broker {
    /// Capture the current values of `pass_env`; unset variables are skipped.
    pub fn new(kind: BrokerKind, pass_env: &[String], timeout: Option<Duration>) -> Self {
        let env = pass_env
            .iter()
            .filter_map(|key| std::env::var(key).ok().map(|value| (key.clone(), value)))
            .collect();
        Self::with_env(kind, env, timeout)
    }

    pub fn with_env(kind: BrokerKind, env: Vec<(String, String)>, timeout: Option<Duration>) -> Self {
        Self { kind, env, timeout }
    }

    pub fn kind(&self) -> BrokerKind {
        self.kind
    }

    /// Full argv including the broker prefix
    pub fn argv(&self, request: &CommandRequest) -> Vec<String> {
        let mut argv = Vec::with_capacity(request.argv.len() + self.env.len() + 2);
        if let Some(program) = self.kind.program() {
            argv.push(program.to_string());
            // Brokers scrub the environment; `env` restores what we pass.
            if !self.env.is_empty() {
                argv.push("env".to_string());
                argv.extend(self.env.iter().map(|(k, v)| format!("{k}={v}")));
            }
        }
        argv.extend(request.argv.iter().cloned());
        argv
    }

    fn invocation(&self, request: &CommandRequest) -> Option<Invocation> {
        let mut inv = Invocation::from_argv(&self.argv(request))?.with_timeout(self.timeout);
        if self.kind == BrokerKind::None {
            for (key, value) in &self.env {
                inv = inv.env(key, value);
            }
        }
        Some(inv)
    }
}

impl ElevationBroker for Broker {
    fn run(
        &self,
        request: &CommandRequest,
        on_line: &mut dyn FnMut(&str),
        cancel: &CancelToken,
    ) -> Result<i32, BrokerError> {
        let inv = self.invocation(request).ok_or_else(|| BrokerError::Launch {
            program: String::new(),
            message: "empty command".to_string(),
        })?;

        let exit = execkit::stream(&inv, cancel, on_line).map_err(|e| BrokerError::Launch {
            program: inv.program.clone(),
            message: e.to_string(),
        })?;

        match exit {
            Exit::Code(code) if self.kind == BrokerKind::Pkexec && PKEXEC_DENIED.contains(&code) => {
                log::warn!("pkexec refused authorization (exit {code})");
                Err(BrokerError::Denied)
            }
            Exit::Code(code) => Ok(code),
            Exit::Signaled(signal) => Err(BrokerError::Signaled(signal)),
            Exit::TimedOut => Err(BrokerError::TimedOut),
            Exit::Cancelled => Err(BrokerError::Cancelled),
        }
    }

    fn describe(&self, request: &CommandRequest) -> String {
        self.argv(request).join(" ")
    }
}
