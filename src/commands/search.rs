use anyhow::Result;
use colored::Colorize;
use declarative::{DesiredState, MemorySink};

use crate::Context;
use crate::commands;
use crate::progress;
use crate::ui;

pub fn run(ctx: &Context, query: &str, json: bool) -> Result<()> {
    let (_config, system) = commands::load(ctx)?;

    let mut sink = MemorySink::default();
    let desired =
        progress::with_spinner(&format!("Searching for '{query}'"), !ctx.quiet && !json, || {
            let snapshot = system.refresh_quiet();
            let mut desired = DesiredState::default();
            desired.search(query, system.source.as_ref(), &snapshot, &mut sink);
            desired
        });
    for line in &sink.lines {
        ui::error(line.trim_start_matches("Error: "));
    }

    if json {
        println!("{}", serde_json::to_string_pretty(desired.packages())?);
        return Ok(());
    }

    let rows = desired.packages();
    if rows.is_empty() {
        ui::info(&format!("No packages match '{query}'"));
        return Ok(());
    }

    ui::header(&format!("Search: {query}"));
    let width = rows.iter().map(|r| r.name.len()).max().unwrap_or(0);
    for row in rows {
        println!(
            "  {} {:width$}  {}",
            ui::package_marker(row.installed_actual, row.selection),
            row.name.bold(),
            ui::truncate(&row.description, 60).dimmed(),
        );
    }
    println!();
    ui::dim(&format!(
        "{} results, {} installed",
        rows.len(),
        rows.iter().filter(|r| r.installed_actual).count()
    ));

    Ok(())
}
