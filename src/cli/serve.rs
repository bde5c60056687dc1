//! `hashmark serve`.

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use hashmark::config::ServeConfig;
use hashmark::{AssetServer, ConsoleLog, Versioner, VersionerConfig};

/// CLI overrides for `[serve]`.
pub struct ServeOverrides {
    pub interface: Option<IpAddr>,
    pub port: Option<u16>,
    pub fallback: Option<PathBuf>,
}

impl ServeOverrides {
    fn apply(self, mut serve: ServeConfig) -> ServeConfig {
        if let Some(interface) = self.interface {
            serve.interface = interface;
        }
        if let Some(port) = self.port {
            serve.port = port;
        }
        if self.fallback.is_some() {
            serve.fallback = self.fallback;
        }
        serve
    }
}

/// Build with file caching on, then serve until the process exits.
pub fn serve_assets(
    mut config: VersionerConfig,
    serve: ServeConfig,
    overrides: ServeOverrides,
    verbose: bool,
) -> Result<()> {
    config.cache_files = true;
    let serve = overrides.apply(serve);

    let versioner = Versioner::new(config, Arc::new(ConsoleLog::new(verbose)));
    let summary = super::runtime()?
        .block_on(versioner.build())
        .context("Build failed")?;
    super::build::report(&summary);

    let delivery = versioner.delivery()?;
    AssetServer::new(delivery, serve.fallback)
        .run(serve.interface, serve.port)
        .context("Server stopped")
}
