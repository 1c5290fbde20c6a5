use anyhow::Result;
use colored::Colorize;
use declarative::MemorySink;

use crate::Context;
use crate::commands;
use crate::progress;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    let (config, system) = commands::load(ctx)?;

    let mut sink = MemorySink::default();
    let snapshot = progress::with_spinner("Collecting system state", !ctx.quiet, || {
        system.refresh(&mut sink)
    });

    ui::header("System Status");
    for line in &sink.lines {
        ui::error(line.trim_start_matches("Error: "));
    }

    ui::section("Packages");
    ui::kv("Installed", &snapshot.installed_packages.len().to_string().bold().to_string());
    ui::kv("Query tool", &config.packages.query_tool);

    ui::section("Services");
    let available = snapshot.available_services.len();
    let enabled = snapshot.enabled_services.len();
    ui::kv(
        "Status",
        &format!(
            "{} available, {} {} enabled, {} disabled",
            available.to_string().bold(),
            enabled.to_string().green(),
            "✓".green(),
            available.saturating_sub(enabled).to_string().dimmed(),
        ),
    );
    ui::kv("Definitions", &config.services.available_dir);
    ui::kv("Enabled via", &config.services.enabled_dir);

    ui::section("Elevation");
    ui::kv("Broker", &config.elevation.broker.to_string());

    let (desired, warnings) = system.declared(&config, &snapshot);
    let pending = declarative::plan(&desired, &snapshot).total();
    ui::section("Declared");
    if pending == 0 {
        ui::kv("Pending", &"in sync".green().to_string());
    } else {
        ui::kv("Pending", &format!("{} changes", pending.to_string().yellow()));
        ui::dim("Run: voidctl diff");
    }
    for warning in warnings {
        ui::warn(&warning);
    }

    println!();
    Ok(())
}
