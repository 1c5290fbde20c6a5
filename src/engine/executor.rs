//! Apply engine - voidctl-specific executor with UI integration

use anyhow::{Context as AnyhowContext, Result};
use chrono::{DateTime, Utc};
use colored::Colorize;
use declarative::{
    ActionKind, ActionPlan, ApplyWorker, ExecuteOptions, ExecuteSummary, ExecutionEvent,
    ExecutionResult,
};
use serde::Serialize;
use xbpskit::ErrorCategory;

use super::System;
use super::differ::{display_plan, display_privilege_boundary};
use crate::progress;
use crate::sudo::BrokerKind;

/// Options for an apply (voidctl-specific, includes `yes` for confirmation skip)
#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    /// Don't make changes, just show what would run
    pub dry_run: bool,
    /// Skip confirmation prompts
    pub yes: bool,
    /// Print a JSON report instead of progress output
    pub json: bool,
}

/// Machine-readable record of an apply
#[derive(Debug, Serialize)]
pub struct ApplyReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub plan: ActionPlan,
    pub results: Vec<ExecutionResult>,
    pub summary: ExecuteSummary,
}

/// Run `plan` with UI: show it, confirm, execute on the apply worker and
/// print the outcome.
pub fn execute(
    system: &System,
    plan: ActionPlan,
    broker: BrokerKind,
    opts: &ApplyOptions,
) -> Result<ExecuteSummary> {
    let interactive = !opts.json;

    if interactive {
        display_plan(&plan);
    }
    if plan.is_empty() {
        if opts.json {
            print_report(&report(Utc::now(), opts, plan, Vec::new()))?;
        }
        return Ok(ExecuteSummary::default());
    }

    if interactive && !opts.dry_run {
        display_privilege_boundary(&plan, broker);
        if !opts.yes && !confirm_proceed()? {
            println!();
            println!("  {} Aborted", "✗".red());
            return Ok(ExecuteSummary {
                skipped: plan.total(),
                ..Default::default()
            });
        }
    }

    let started_at = Utc::now();
    let job = system.job(
        plan.clone(),
        ExecuteOptions {
            dry_run: opts.dry_run,
        },
    );
    let handle = ApplyWorker::new().spawn(job)?;

    if interactive {
        println!();
    }
    let pb = progress::spinner("Starting", interactive);
    for event in handle.events() {
        match event {
            ExecutionEvent::PlanStarted(actions) => {
                log::info!("Applying {} actions", actions.len());
            }
            ExecutionEvent::ActionStarted { index, action } => {
                pb.set_message(format!("[{}/{}] {}", index + 1, plan.total(), action.header()));
            }
            ExecutionEvent::Line(line) => {
                if interactive {
                    pb.println(format!("  {line}"));
                }
            }
            ExecutionEvent::ActionFinished(result) => {
                if interactive {
                    pb.println(format!("  {}", result_line(&result)));
                }
            }
            ExecutionEvent::Refreshed(snapshot) => {
                pb.set_message("Refreshing state");
                log::debug!(
                    "Refreshed: {} packages, {} services enabled",
                    snapshot.installed_packages.len(),
                    snapshot.enabled_services.len()
                );
            }
            ExecutionEvent::Finished(_) => {}
        }
    }
    pb.finish_and_clear();

    let results = handle
        .join()
        .context("Apply worker stopped unexpectedly")?;
    let summary = ExecuteSummary::from_results(&results);

    if opts.json {
        print_report(&report(started_at, opts, plan, results))?;
    } else {
        print_summary(&summary, &results, opts.dry_run);
    }

    Ok(summary)
}

fn report(
    started_at: DateTime<Utc>,
    opts: &ApplyOptions,
    plan: ActionPlan,
    results: Vec<ExecutionResult>,
) -> ApplyReport {
    ApplyReport {
        started_at,
        finished_at: Utc::now(),
        dry_run: opts.dry_run,
        summary: ExecuteSummary::from_results(&results),
        plan,
        results,
    }
}

fn print_report(report: &ApplyReport) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

fn result_line(result: &ExecutionResult) -> String {
    if result.skipped {
        format!("{} {}", "⊘".dimmed(), result.action)
    } else if result.succeeded {
        format!("{} {}", "✓".green(), result.action)
    } else {
        let reason = result
            .failure
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        format!("{} {} ({})", "✗".red(), result.action, reason)
    }
}

/// Confirm with user
fn confirm_proceed() -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt("Continue?")
        .default(true)
        .interact()?;

    Ok(confirmed)
}

/// Category of a failed package action, from its output
pub fn classify_failure(result: &ExecutionResult) -> Option<ErrorCategory> {
    if result.succeeded || result.action.kind().target_type() != "package" {
        return None;
    }
    Some(ErrorCategory::classify(&result.output_lines.join("\n")))
}

/// Print final summary
fn print_summary(summary: &ExecuteSummary, results: &[ExecutionResult], dry_run: bool) {
    println!();
    if dry_run {
        println!("  {} Dry run - no changes made", "ℹ".blue());
    } else if summary.is_success() {
        println!("  {} System reconciled successfully!", "✓".green().bold());
    } else {
        println!("  {} Reconciled with errors", "⚠".yellow().bold());
    }

    if summary.succeeded > 0 {
        println!("    • {} actions succeeded", summary.succeeded);
    }
    if summary.skipped > 0 {
        println!("    • {} actions skipped (already satisfied)", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "actions".red());
    }

    for result in results.iter().filter(|r| !r.succeeded) {
        let advice = match result.action.kind() {
            ActionKind::Install | ActionKind::Uninstall => classify_failure(result)
                .filter(|c| *c != ErrorCategory::Other)
                .map(|c| format!("{}: {}", c.description(), c.advice())),
            ActionKind::Enable | ActionKind::Disable => None,
        };
        if let Some(advice) = advice {
            println!("      {} {}", result.action.to_string().dimmed(), advice);
        }
    }
}
