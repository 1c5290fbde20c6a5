//! Reconciliation planner - diffs desired state against a snapshot

use crate::desired::{DesiredState, Group};
use crate::types::{ActionPlan, Selection, Snapshot};
use std::collections::HashSet;

/// Compute the actions that move `snapshot` to `desired`.
///
/// Pure and deterministic. Intents the snapshot already satisfies produce no
/// action, so an empty plan means nothing needs to change.
pub fn plan(desired: &DesiredState, snapshot: &Snapshot) -> ActionPlan {
    let mut plan = ActionPlan::default();

    let mut seen = HashSet::new();
    for row in desired.packages() {
        if !seen.insert(row.name.as_str()) {
            continue;
        }
        match row.selection {
            Selection::Install if !snapshot.is_installed(&row.name) => {
                plan.to_install.push(row.name.clone());
            }
            Selection::Remove if snapshot.is_installed(&row.name) => {
                plan.to_uninstall.push(row.name.clone());
            }
            _ => {}
        }
    }

    plan.to_enable = desired
        .services(Group::Enabled)
        .iter()
        .filter(|s| !snapshot.is_enabled(&s.name))
        .map(|s| s.name.clone())
        .collect();

    plan.to_disable = desired
        .services(Group::Disabled)
        .iter()
        .filter(|s| snapshot.is_enabled(&s.name))
        .map(|s| s.name.clone())
        .collect();

    plan
}

impl ActionPlan {
    /// Filter plan to only include actions matching a target pattern
    ///
    /// Target format: "packages", "services", or "type.name"
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        let Some(target) = target else {
            return self;
        };
        let (target_type, name) = parse_target(target);
        let keep = |kind: &str, list: Vec<String>| -> Vec<String> {
            if target_type.as_deref().is_some_and(|t| t != kind) {
                return Vec::new();
            }
            list.into_iter()
                .filter(|n| name.as_deref().is_none_or(|wanted| n == wanted))
                .collect()
        };

        Self {
            to_install: keep("package", self.to_install),
            to_uninstall: keep("package", self.to_uninstall),
            to_disable: keep("service", self.to_disable),
            to_enable: keep("service", self.to_enable),
        }
    }
}

/// Parse a target string like "type.name" into (type, name)
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    let normalize = |t: &str| match t {
        "packages" | "package" | "pkg" => Some("package".to_string()),
        "services" | "service" | "sv" => Some("service".to_string()),
        _ => None,
    };

    match target.split_once('.') {
        Some((kind, name)) => match normalize(kind) {
            Some(kind) => (Some(kind), Some(name.to_string())),
            None => (None, Some(target.to_string())),
        },
        None => match normalize(target) {
            Some(kind) => (Some(kind), None),
            None => (None, Some(target.to_string())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Action, PackageHit};
    use std::collections::BTreeSet;

    fn snapshot() -> Snapshot {
        Snapshot {
            installed_packages: BTreeSet::from(["vim".to_string()]),
            enabled_services: BTreeSet::from(["sshd".to_string()]),
            available_services: vec!["cron".into(), "sshd".into()],
        }
    }

    fn with_rows(snap: &Snapshot, names: &[&str]) -> DesiredState {
        let mut state = DesiredState::with_services(snap);
        let hits = names
            .iter()
            .map(|n| PackageHit {
                name: (*n).to_string(),
                description: String::new(),
            })
            .collect();
        state.replace_results("q", hits, snap);
        state
    }

    #[test]
    fn test_scenario_plan_and_order() {
        let snap = snapshot();
        let mut desired = with_rows(&snap, &["htop", "vim"]);
        desired.toggle_selection("htop");
        desired.toggle_removal("vim");
        desired.move_service("sshd", Group::Enabled, Group::Disabled);
        desired.move_service("cron", Group::Disabled, Group::Enabled);

        let plan = plan(&desired, &snap);
        assert_eq!(plan.to_install, vec!["htop"]);
        assert_eq!(plan.to_uninstall, vec!["vim"]);
        assert_eq!(plan.to_disable, vec!["sshd"]);
        assert_eq!(plan.to_enable, vec!["cron"]);
        assert_eq!(
            plan.actions(),
            vec![
                Action::Disable("sshd".into()),
                Action::Enable("cron".into()),
                Action::Uninstall("vim".into()),
                Action::Install("htop".into()),
            ]
        );
    }

    #[test]
    fn test_idempotent_when_desired_matches_actual() {
        let snap = snapshot();
        // Services start partitioned by actual state
        let mut desired = with_rows(&snap, &["vim", "htop"]);
        desired.toggle_selection("vim");
        desired.toggle_removal("htop");

        assert!(plan(&desired, &snap).is_empty());
    }

    #[test]
    fn test_satisfied_intents_are_filtered() {
        let snap = snapshot();
        let mut desired = with_rows(&snap, &["vim", "htop"]);
        desired.toggle_selection("vim");
        desired.toggle_removal("htop");
        desired.move_service("cron", Group::Disabled, Group::Enabled);
        desired.move_service("cron", Group::Enabled, Group::Disabled);

        let plan = plan(&desired, &snap);
        assert!(!plan.to_install.contains(&"vim".to_string()));
        assert!(!plan.to_uninstall.contains(&"htop".to_string()));
        assert!(plan.to_enable.is_empty());
        assert!(plan.to_disable.is_empty());
    }

    #[test]
    fn test_filter_by_target() {
        let full = ActionPlan {
            to_install: vec!["htop".into(), "git".into()],
            to_uninstall: vec!["vim".into()],
            to_disable: vec!["sshd".into()],
            to_enable: vec!["cron".into()],
        };

        let packages = full.clone().filter_by_target(Some("packages"));
        assert_eq!(packages.total(), 3);
        assert!(packages.to_enable.is_empty());

        let one = full.clone().filter_by_target(Some("service.cron"));
        assert_eq!(one.to_enable, vec!["cron"]);
        assert_eq!(one.total(), 1);

        let by_name = full.clone().filter_by_target(Some("git"));
        assert_eq!(by_name.to_install, vec!["git"]);
        assert_eq!(by_name.total(), 1);

        assert_eq!(full.clone().filter_by_target(None), full);
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target("services"), (Some("service".to_string()), None));
        assert_eq!(
            parse_target("pkg.htop"),
            (Some("package".to_string()), Some("htop".to_string()))
        );
        assert_eq!(parse_target("a.b"), (None, Some("a.b".to_string())));
    }
}
