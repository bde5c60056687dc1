//! `hashmark url`.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use hashmark::{AssetClass, BuildLog, ConsoleLog, Versioner, VersionerConfig};

/// Print one versioned URL per logical path.
///
/// Resolves from `manifest` when given, otherwise runs a build first.
pub fn print_urls(
    config: VersionerConfig,
    class: &str,
    paths: &[String],
    manifest: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    let class: AssetClass = class.parse()?;
    let log: Arc<dyn BuildLog> = Arc::new(ConsoleLog::new(verbose));

    let versioner = super::runtime()?.block_on(async {
        match manifest {
            Some(path) => Versioner::from_manifest(config, path, log)
                .await
                .context("Failed to load manifest"),
            None => {
                let versioner = Versioner::new(config, log);
                versioner.build().await.context("Build failed")?;
                Ok(versioner)
            }
        }
    })?;

    let mut missing = 0;
    for path in paths {
        match versioner.url(path, class)? {
            Some(url) => println!("{url}"),
            None => {
                hashmark::log!("error"; "no versioned {} for `{}`", class, path);
                missing += 1;
            }
        }
    }

    if missing > 0 {
        bail!("{missing} of {} paths are not versioned", paths.len());
    }
    Ok(())
}
