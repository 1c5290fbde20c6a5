use anyhow::Result;
use declarative::{ActionPlan, MemorySink};

use crate::Context;
use crate::commands;
use crate::config::Config;
use crate::engine::System;
use crate::engine::differ::display_plan;
use crate::engine::executor::{self, ApplyOptions};
use crate::progress;
use crate::ui;

/// Show what `apply` would change
pub fn diff(ctx: &Context, only: Option<&str>) -> Result<()> {
    let (config, system) = commands::load(ctx)?;
    let plan = declared_plan(ctx, &config, &system, only, true);
    display_plan(&plan);
    Ok(())
}

/// Converge the system to the declared configuration
pub fn apply(ctx: &Context, only: Option<&str>, opts: &ApplyOptions) -> Result<()> {
    let (config, system) = commands::load(ctx)?;
    let plan = declared_plan(ctx, &config, &system, only, !opts.json);

    let summary = executor::execute(&system, plan, config.elevation.broker, opts)?;
    if !summary.is_success() {
        anyhow::bail!("{} of {} actions failed", summary.failed, summary.total());
    }
    Ok(())
}

fn declared_plan(
    ctx: &Context,
    config: &Config,
    system: &System,
    only: Option<&str>,
    show_warnings: bool,
) -> ActionPlan {
    let mut sink = MemorySink::default();
    let snapshot = progress::with_spinner("Collecting system state", !ctx.quiet && show_warnings, || {
        system.refresh(&mut sink)
    });

    let (desired, warnings) = system.declared(config, &snapshot);
    if show_warnings {
        for line in &sink.lines {
            ui::error(line.trim_start_matches("Error: "));
        }
        for warning in &warnings {
            ui::warn(warning);
        }
    }

    declarative::plan(&desired, &snapshot).filter_by_target(only)
}
