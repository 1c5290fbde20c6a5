use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "voidctl")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(
    about = "Reconcile Void Linux packages and runit services with a declared desired state",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: $VOIDCTL_CONFIG_DIR/config.toml)
    #[arg(long, global = true, env = "VOIDCTL_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show installed package count and service states
    Status,

    /// Search remote repositories
    Search(SearchArgs),

    /// List available services and whether they are enabled
    Services,

    /// Show what `apply` would change
    Diff(TargetArgs),

    /// Converge the system to the declared configuration
    Apply(ApplyArgs),

    /// Interactive session: search, select, move services, apply
    Shell,

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser)]
pub struct SearchArgs {
    /// Name or description to search for
    pub query: String,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser)]
pub struct TargetArgs {
    /// Only consider a target: packages, services, or type.name (e.g. package.htop)
    #[arg(short, long)]
    pub only: Option<String>,
}

#[derive(Parser)]
pub struct ApplyArgs {
    /// Only apply a target: packages, services, or type.name (e.g. service.sshd)
    #[arg(short, long)]
    pub only: Option<String>,

    /// Show the commands that would run without running them
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Don't ask for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Print a JSON report instead of progress output (implies --yes)
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,

    /// Print the config file path
    Path,

    /// Check the config file for conflicts
    Validate,
}
