use anyhow::Result;
use colored::Colorize;
use declarative::{Group, MemorySink};

use crate::Context;
use crate::commands;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    let (config, system) = commands::load(ctx)?;

    let mut sink = MemorySink::default();
    let snapshot = system.refresh(&mut sink);
    for line in &sink.lines {
        ui::error(line.trim_start_matches("Error: "));
    }

    let (desired, _) = system.declared(&config, &snapshot);

    ui::header("Services");
    if snapshot.available_services.is_empty() {
        ui::dim(&format!("No service definitions in {}", config.services.available_dir));
        return Ok(());
    }

    for group in [Group::Enabled, Group::Disabled] {
        ui::section(&format!("{group}"));
        let records = desired.services(group);
        if records.is_empty() {
            ui::dim("(none)");
        }
        for record in records {
            let state = if record.enabled_actual {
                "✓".green()
            } else {
                "○".dimmed()
            };
            let pending = if record.enabled_actual == (group == Group::Enabled) {
                String::new()
            } else {
                format!(" ({})", if record.enabled_actual { "will disable" } else { "will enable" })
                    .yellow()
                    .to_string()
            };
            println!("  {state} {}{pending}", record.name);
        }
    }
    println!();

    Ok(())
}
