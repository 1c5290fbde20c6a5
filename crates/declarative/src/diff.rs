//! Diff summaries for displaying a plan

use crate::types::{Action, ActionKind, ActionPlan};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    /// Packages to install plus services to enable
    pub additions: usize,
    /// Packages to remove plus services to disable
    pub removals: usize,
    pub packages: usize,
    pub services: usize,
}

impl DiffSummary {
    /// Create a summary from a plan
    pub fn from_plan(plan: &ActionPlan) -> Self {
        let mut summary = Self::default();
        for action in plan.actions() {
            match action.kind() {
                ActionKind::Install | ActionKind::Enable => summary.additions += 1,
                ActionKind::Uninstall | ActionKind::Disable => summary.removals += 1,
            }
            match action.kind().target_type() {
                "package" => summary.packages += 1,
                _ => summary.services += 1,
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group actions by target type ("package" / "service"), keeping order
pub fn group_by_type(actions: &[Action]) -> BTreeMap<&'static str, Vec<&Action>> {
    let mut groups: BTreeMap<&'static str, Vec<&Action>> = BTreeMap::new();
    for action in actions {
        groups.entry(action.kind().target_type()).or_default().push(action);
    }
    groups
}
