//! Provider traits
//!
//! These traits keep the reconciliation core free of any particular
//! elevation mechanism, package tool or presentation layer.

use crate::error::BrokerError;
use crate::types::{Action, ActionPlan, CommandRequest, ExecuteSummary, ExecutionResult, Snapshot};
use execkit::CancelToken;
use std::sync::Arc;

/// Runs commands with elevated privileges
///
/// Implementations authorize and run one command at a time, streaming its
/// combined output line by line.
pub trait ElevationBroker: Send + Sync {
    /// Run `request` to completion and return its exit code
    fn run(
        &self,
        request: &CommandRequest,
        on_line: &mut dyn FnMut(&str),
        cancel: &CancelToken,
    ) -> Result<i32, BrokerError>;

    /// The full command line that `run` would execute
    fn describe(&self, request: &CommandRequest) -> String {
        request.to_string()
    }
}

/// Translates actions into concrete command steps
pub trait CommandSet: Send + Sync {
    /// Steps for `action`, run in order until one fails
    fn steps(&self, action: &Action) -> Vec<CommandRequest>;
}

/// Receives progress lines and lifecycle events, in execution order
pub trait OutputSink: Send {
    /// Called for every progress or output line
    fn on_line(&mut self, line: &str);

    /// Called once before the first action
    fn on_plan_start(&mut self, _plan: &ActionPlan) {}

    /// Called when starting an action
    fn on_action_start(&mut self, _index: usize, _action: &Action) {}

    /// Called when an action completes (including skips)
    fn on_action_complete(&mut self, _result: &ExecutionResult) {}

    /// Called after the post-apply snapshot replaced the old one
    fn on_refreshed(&mut self, _snapshot: &Arc<Snapshot>) {}

    /// Called last
    fn on_finished(&mut self, _summary: &ExecuteSummary) {}
}

/// Discards everything
pub struct NullSink;

impl OutputSink for NullSink {
    fn on_line(&mut self, _line: &str) {}
}

/// Collects lines in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub lines: Vec<String>,
}

impl OutputSink for MemorySink {
    fn on_line(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }
}
