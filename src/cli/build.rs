//! `hashmark build`.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use hashmark::{BuildSummary, ConsoleLog, Versioner, VersionerConfig, log};

/// Build every configured class, then optionally save files and a manifest.
pub fn build_assets(
    mut config: VersionerConfig,
    output: Option<&Path>,
    manifest: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    // Saving needs the processed bytes
    if output.is_some() {
        config.cache_files = true;
    }

    let versioner = Versioner::new(config, Arc::new(ConsoleLog::new(verbose)));
    super::runtime()?.block_on(async {
        let summary = versioner.build().await.context("Build failed")?;
        report(&summary);

        if let Some(dir) = output {
            let written = versioner.save_all(dir).await.context("Failed to save versioned files")?;
            log!("build"; "saved {} files to {}", written, dir.display());
        }
        if let Some(path) = manifest {
            versioner
                .write_manifest(path)
                .await
                .context("Failed to write manifest")?;
            log!("build"; "manifest written to {}", path.display());
        }
        Ok(())
    })
}

pub fn report(summary: &BuildSummary) {
    log!(
        "build";
        "versioned {} files ({}) in {}ms",
        summary.files,
        format_size(summary.bytes),
        summary.elapsed.as_millis()
    );
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit + 1 < UNITS.len() {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}
