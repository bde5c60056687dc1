//! Command-line interface module.

mod args;
pub mod build;
pub mod serve;
pub mod url;

pub use args::{Cli, Commands};

use anyhow::{Context, Result, anyhow};
use hashmark::config::{self, ServeConfig, VersionerConfig};

/// Locate and load the config file named by `--config`.
pub fn load_config(cli: &Cli) -> Result<(VersionerConfig, ServeConfig)> {
    let cwd = std::env::current_dir().context("Failed to get current working directory")?;
    let path = config::find_config_file(&cwd, &cli.config)
        .ok_or_else(|| anyhow!("Config file '{}' not found", cli.config.display()))?;

    hashmark::debug!("config"; "using {}", path.display());
    config::load_config(&path).with_context(|| format!("Failed to load {}", path.display()))
}

/// Multi-threaded runtime for one command.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")
}
