mod cli;
mod commands;
mod config;
mod engine;
mod paths;
mod progress;
mod sudo;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config_path: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config_path: cli.config,
    };

    match cli.command {
        Command::Status => commands::status::run(&ctx),
        Command::Search(args) => commands::search::run(&ctx, &args.query, args.json),
        Command::Services => commands::services::run(&ctx),
        Command::Diff(args) => commands::apply::diff(&ctx, args.only.as_deref()),
        Command::Apply(args) => commands::apply::apply(
            &ctx,
            args.only.as_deref(),
            &engine::executor::ApplyOptions {
                dry_run: args.dry_run,
                yes: args.yes || args.json,
                json: args.json,
            },
        ),
        Command::Shell => commands::shell::run(&ctx),
        Command::Config(cmd) => commands::config::run(&ctx, cmd),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "voidctl", &mut io::stdout());
            Ok(())
        }
    }
}
