pub mod apply;
pub mod config;
pub mod search;
pub mod services;
pub mod shell;
pub mod status;

use anyhow::Result;

use crate::Context;
use crate::config::Config;
use crate::engine::System;

/// Load the config and wire up the system it describes
pub(crate) fn load(ctx: &Context) -> Result<(Config, System)> {
    let (config, path) = Config::load_from(ctx.config_path.as_deref())?;
    log::debug!("Using config {}", path.display());
    let system = System::from_config(&config);
    Ok((config, system))
}
