use anyhow::Result;
use std::fs;

use crate::Context;
use crate::cli::ConfigCommand;
use crate::config::Config;
use crate::paths;
use crate::ui;

pub fn run(ctx: &Context, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => show(ctx),
        ConfigCommand::Path => path(ctx),
        ConfigCommand::Validate => validate(ctx),
    }
}

fn show(ctx: &Context) -> Result<()> {
    let path = paths::config_file(ctx.config_path.as_deref())?;
    let config = Config::load(&path)?;
    print!("{}", config.to_toml()?);
    Ok(())
}

fn path(ctx: &Context) -> Result<()> {
    let path = paths::config_file(ctx.config_path.as_deref())?;
    println!("{}", path.display());
    Ok(())
}

fn validate(ctx: &Context) -> Result<()> {
    let path = paths::config_file(ctx.config_path.as_deref())?;
    ui::header("Validating Configuration");
    ui::kv("File", &path.display().to_string());

    if !path.exists() {
        ui::info("No config file; defaults apply");
        return Ok(());
    }

    let content = fs::read_to_string(&path)?;
    let config = match Config::parse(&content) {
        Ok(config) => config,
        Err(e) => {
            ui::error(&format!("Invalid: {e}"));
            anyhow::bail!("{} is not a valid config", path.display());
        }
    };

    let warnings = config.validate();
    if warnings.is_empty() {
        ui::success("Valid");
    } else {
        for warning in &warnings {
            ui::warn(warning);
        }
    }
    Ok(())
}
