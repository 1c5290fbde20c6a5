//! Interactive session
//!
//! Stdin lines, debounced search results and apply progress all arrive on one
//! channel and are handled in order on the main thread, which is the only
//! place the desired state is edited.

use anyhow::Result;
use colored::Colorize;
use declarative::{
    ApplyWorker, CancelToken, DebouncedGate, DesiredState, ExecuteOptions, ExecutionEvent,
    ExecutionResult, Group, MemorySink, PackageHit, search_or_report,
};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::mpsc::{self, Sender};
use std::thread;

use crate::Context;
use crate::commands;
use crate::engine::System;
use crate::engine::differ::display_plan;
use crate::ui;

enum ShellEvent {
    Input(String),
    Eof,
    SearchResults {
        query: String,
        hits: Vec<PackageHit>,
        errors: Vec<String>,
    },
    Apply(ExecutionEvent),
    ApplyDone(Option<Vec<ExecutionResult>>),
}

#[derive(Debug, PartialEq, Eq)]
enum ShellCommand {
    Search(String),
    Install(String),
    Remove(String),
    Enable(String),
    Disable(String),
    List,
    Plan,
    Apply { dry_run: bool },
    Cancel,
    Refresh,
    Help,
    Quit,
    Empty,
}

impl ShellCommand {
    fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(w, r)| (w, r.trim()));

        let named = |make: fn(String) -> Self| {
            if rest.is_empty() {
                Err(format!("'{word}' needs a name"))
            } else {
                Ok(make(rest.to_string()))
            }
        };

        match word {
            "" => Ok(Self::Empty),
            "/" | "s" | "search" => Ok(Self::Search(rest.to_string())),
            "i" | "install" | "select" => named(Self::Install),
            "r" | "remove" => named(Self::Remove),
            "e" | "enable" => named(Self::Enable),
            "d" | "disable" => named(Self::Disable),
            "l" | "ls" | "list" => Ok(Self::List),
            "p" | "plan" | "diff" => Ok(Self::Plan),
            "apply" => match rest {
                "" => Ok(Self::Apply { dry_run: false }),
                "-n" | "--dry-run" => Ok(Self::Apply { dry_run: true }),
                other => Err(format!("unknown apply option '{other}'")),
            },
            "cancel" => Ok(Self::Cancel),
            "refresh" => Ok(Self::Refresh),
            "?" | "h" | "help" => Ok(Self::Help),
            "q" | "quit" | "exit" => Ok(Self::Quit),
            other => Err(format!("unknown command '{other}' (try 'help')")),
        }
    }
}

struct Session {
    system: System,
    desired: DesiredState,
    worker: ApplyWorker,
    running: Option<CancelToken>,
    quitting: bool,
}

pub fn run(ctx: &Context) -> Result<()> {
    let (config, system) = commands::load(ctx)?;

    let mut sink = MemorySink::default();
    let snapshot = system.refresh(&mut sink);
    for line in &sink.lines {
        ui::error(line.trim_start_matches("Error: "));
    }
    let (desired, warnings) = system.declared(&config, &snapshot);
    for warning in &warnings {
        ui::warn(warning);
    }

    let (tx, rx) = mpsc::channel();
    spawn_stdin_reader(tx.clone());
    let gate = search_gate(&system, config.debounce(), tx.clone());

    let mut session = Session {
        system,
        desired,
        worker: ApplyWorker::new(),
        running: None,
        quitting: false,
    };

    ui::header("voidctl shell");
    ui::dim("Type 'help' for commands.");
    prompt();

    for event in rx.iter() {
        match event {
            ShellEvent::Input(line) => {
                match ShellCommand::parse(&line) {
                    Ok(command) => session.handle(command, &gate, &tx),
                    Err(message) => ui::error(&message),
                }
                if session.quitting && session.running.is_none() {
                    break;
                }
                prompt();
            }
            ShellEvent::Eof => {
                session.quit();
                if session.running.is_none() {
                    break;
                }
            }
            ShellEvent::SearchResults { query, hits, errors } => {
                for line in &errors {
                    ui::error(line.trim_start_matches("Error: "));
                }
                session.show_results(&query, hits);
                prompt();
            }
            ShellEvent::Apply(event) => session.on_apply_event(event, &gate),
            ShellEvent::ApplyDone(results) => {
                session.running = None;
                if results.is_none() {
                    ui::error("Apply worker stopped unexpectedly");
                }
                if session.quitting {
                    break;
                }
                prompt();
            }
        }
    }

    Ok(())
}

impl Session {
    fn handle(&mut self, command: ShellCommand, gate: &DebouncedGate, tx: &Sender<ShellEvent>) {
        match command {
            ShellCommand::Empty => {}
            ShellCommand::Search(query) => gate.on_input(query),
            ShellCommand::Install(name) => {
                if !self.desired.toggle_selection(&name) {
                    ui::error(&format!("'{name}' is not in the results; search for it first"));
                }
            }
            ShellCommand::Remove(name) => {
                if !self.desired.toggle_removal(&name) {
                    ui::error(&format!("'{name}' is not in the results; search for it first"));
                }
            }
            ShellCommand::Enable(name) => self.move_service(&name, Group::Enabled),
            ShellCommand::Disable(name) => self.move_service(&name, Group::Disabled),
            ShellCommand::List => {
                show_packages(&self.desired);
                show_services(&self.desired);
            }
            ShellCommand::Plan => {
                let snapshot = self.system.store.current();
                display_plan(&declarative::plan(&self.desired, &snapshot));
            }
            ShellCommand::Apply { dry_run } => self.apply(dry_run, tx),
            ShellCommand::Cancel => match &self.running {
                Some(token) => {
                    token.cancel();
                    ui::warn("Cancelling apply");
                }
                None => ui::info("Nothing is running"),
            },
            ShellCommand::Refresh => {
                if self.running.is_some() {
                    ui::warn("Apply in progress; state refreshes when it finishes");
                    return;
                }
                let snapshot = self.system.refresh_quiet();
                self.desired.refresh_actual(&snapshot);
                ui::success("Refreshed");
            }
            ShellCommand::Help => help(),
            ShellCommand::Quit => self.quit(),
        }
    }

    fn move_service(&mut self, name: &str, to: Group) {
        match self.desired.group_of(name) {
            Some(from) if from == to => ui::info(&format!("'{name}' is already {to}")),
            Some(from) => {
                self.desired.move_service(name, from, to);
            }
            None => ui::error(&format!("No service named '{name}'")),
        }
    }

    fn apply(&mut self, dry_run: bool, tx: &Sender<ShellEvent>) {
        let snapshot = self.system.store.current();
        let plan = declarative::plan(&self.desired, &snapshot);
        if plan.is_empty() {
            ui::success("Nothing to do");
            return;
        }

        let job = self.system.job(plan, ExecuteOptions { dry_run });
        let handle = match self.worker.spawn(job) {
            Ok(handle) => handle,
            Err(e) => {
                ui::error(&e.to_string());
                return;
            }
        };
        self.running = Some(handle.cancel_token());

        let tx = tx.clone();
        thread::spawn(move || {
            for event in handle.events() {
                if tx.send(ShellEvent::Apply(event)).is_err() {
                    break;
                }
            }
            let _ = tx.send(ShellEvent::ApplyDone(handle.join()));
        });
    }

    fn on_apply_event(&mut self, event: ExecutionEvent, gate: &DebouncedGate) {
        match event {
            ExecutionEvent::PlanStarted(actions) => {
                println!();
                ui::info(&format!("Applying {} actions ('cancel' to stop)", actions.len()));
            }
            ExecutionEvent::Line(line) => println!("{line}"),
            ExecutionEvent::Refreshed(snapshot) => {
                self.desired.refresh_actual(&snapshot);
                if let Some(query) = self.desired.last_query() {
                    gate.on_input(query);
                }
            }
            ExecutionEvent::ActionStarted { .. }
            | ExecutionEvent::ActionFinished(_)
            | ExecutionEvent::Finished(_) => {}
        }
    }

    fn show_results(&mut self, query: &str, hits: Vec<PackageHit>) {
        if query.trim().is_empty() {
            self.desired.clear();
            return;
        }
        let snapshot = self.system.store.current();
        self.desired.replace_results(query, hits, &snapshot);
        println!();
        show_packages(&self.desired);
    }

    fn quit(&mut self) {
        self.quitting = true;
        if let Some(token) = &self.running {
            ui::warn("Cancelling apply before exit");
            token.cancel();
        }
    }
}

/// Searches run on the gate thread; results come back as events
fn search_gate(
    system: &System,
    interval: std::time::Duration,
    tx: Sender<ShellEvent>,
) -> DebouncedGate {
    let source = Arc::clone(&system.source);
    DebouncedGate::new(interval, move |query| {
        let query = query.trim().to_string();
        let mut sink = MemorySink::default();
        let hits = if query.is_empty() {
            Vec::new()
        } else {
            search_or_report(source.as_ref(), &query, &mut sink)
        };
        let _ = tx.send(ShellEvent::SearchResults {
            query,
            hits,
            errors: sink.lines,
        });
    })
}

fn spawn_stdin_reader(tx: Sender<ShellEvent>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(ShellEvent::Input(line)).is_err() {
                return;
            }
        }
        let _ = tx.send(ShellEvent::Eof);
    });
}

fn prompt() {
    print!("{} ", "voidctl>".cyan().bold());
    let _ = io::stdout().flush();
}

fn show_packages(desired: &DesiredState) {
    let rows = desired.packages();
    match desired.last_query() {
        Some(query) => ui::section(&format!("Packages matching '{query}'")),
        None => ui::section("Packages"),
    }
    if rows.is_empty() {
        ui::dim("(no results)");
        return;
    }
    let width = rows.iter().map(|r| r.name.len()).max().unwrap_or(0);
    for row in rows {
        println!(
            "  {} {:width$}  {}",
            ui::package_marker(row.installed_actual, row.selection),
            row.name,
            ui::truncate(&row.description, 60).dimmed(),
        );
    }
}

fn show_services(desired: &DesiredState) {
    for group in [Group::Enabled, Group::Disabled] {
        ui::section(&format!("Services {group}"));
        let names: Vec<String> = desired
            .services(group)
            .iter()
            .map(|s| {
                if s.enabled_actual == (group == Group::Enabled) {
                    s.name.clone()
                } else {
                    format!("{}*", s.name).yellow().to_string()
                }
            })
            .collect();
        if names.is_empty() {
            ui::dim("(none)");
        } else {
            println!("  {}", names.join("  "));
        }
    }
}

fn help() {
    ui::section("Commands");
    ui::kv("search <text>", "search repositories (alias: /, s)");
    ui::kv("install <pkg>", "toggle install intent (alias: i, select)");
    ui::kv("remove <pkg>", "toggle removal intent (alias: r)");
    ui::kv("enable <svc>", "move a service to the enabled group (alias: e)");
    ui::kv("disable <svc>", "move a service to the disabled group (alias: d)");
    ui::kv("list", "show packages and services (* = pending change)");
    ui::kv("plan", "show what apply would do");
    ui::kv("apply [-n]", "apply the plan in the background");
    ui::kv("cancel", "stop a running apply");
    ui::kv("refresh", "re-read installed packages and services");
    ui::kv("quit", "leave the shell");
}
