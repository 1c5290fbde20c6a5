//! Plan display - voidctl-specific UI

use colored::Colorize;
use declarative::{Action, ActionKind, ActionPlan, DiffSummary, group_by_type};

use crate::sudo::BrokerKind;

/// Display a plan in a user-friendly format
pub fn display_plan(plan: &ActionPlan) {
    if plan.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    let actions = plan.actions();
    let groups = group_by_type(&actions);

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Reconciliation Plan".bold()
    );
    println!("│");

    // Services first: they run first
    for target_type in ["service", "package"] {
        let Some(type_actions) = groups.get(target_type) else {
            continue;
        };
        let type_name = match target_type {
            "service" => "Services (runit)",
            _ => "Packages (xbps)",
        };
        println!("│ {}", type_name.bold());

        for action in type_actions {
            println!(
                "│   {} {:<30} {}",
                symbol(action),
                action.name(),
                describe(action.kind()).dimmed()
            );
        }
        println!("│");
    }

    let summary = DiffSummary::from_plan(plan);
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes ({} additions, {} removals)",
        summary.total().to_string().bold(),
        summary.additions.to_string().green(),
        summary.removals.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

fn symbol(action: &Action) -> colored::ColoredString {
    match action.kind() {
        ActionKind::Install | ActionKind::Enable => "+".green(),
        ActionKind::Uninstall | ActionKind::Disable => "-".red(),
    }
}

fn describe(kind: ActionKind) -> &'static str {
    match kind {
        ActionKind::Install => "(not installed → install)",
        ActionKind::Uninstall => "(installed → remove)",
        ActionKind::Enable => "(disabled → enable, sv up)",
        ActionKind::Disable => "(enabled → sv down, disable)",
    }
}

/// Display the privilege boundary notice
pub fn display_privilege_boundary(plan: &ActionPlan, broker: BrokerKind) {
    if plan.is_empty() {
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Privilege Boundary".yellow().bold()
    );
    println!("│");
    match broker {
        BrokerKind::None => println!(
            "│  {}  {} commands will run as the current user (no broker).",
            "⚠".yellow(),
            plan.total()
        ),
        kind => println!(
            "│  {}  {} actions run through {}; each command is authorized on its own.",
            "⚠".yellow(),
            plan.total(),
            kind.to_string().bold()
        ),
    }
    println!("│");
    println!("└─────────────────────────────────────────────────────────────┘");
}
