//! Build orchestration.
//!
//! One build runs the stages in order. Each stage has three phases:
//!
//! ```text
//! ┌────────────┐   ┌──────────────────────┐   ┌──────────────────────┐
//! │ load (≤50) │──►│ process chain (≤50)  │──►│ commit (single task) │
//! └────────────┘   └──────────────────────┘   └──────────────────────┘
//! ```
//!
//! - load failures stop the stage before any processing is launched
//! - processing is fail-fast: after the first error nothing new is
//!   launched, in-flight files drain and successful ones are committed
//! - a failed stage ends the build; earlier commits stay in the index
//! - buffers are released at the end when `cache_files` is off, whether
//!   the build succeeded or not

mod save;
mod stage;

pub use save::{SAVE_CONCURRENCY, read_manifest, save_all, write_manifest};
pub use stage::Stage;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;

use crate::asset::{AssetClass, LogicalPath, Origin, SharedIndex, derive_key, scan};
use crate::config::{TypeConfig, VersionerConfig};
use crate::error::BuildError;
use crate::logger::BuildLog;
use crate::pipeline::{ProcessorChain, StyleRewriter};

/// Maximum number of files processed concurrently per stage.
pub const PROCESS_CONCURRENCY: usize = 50;

/// Totals of one build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildSummary {
    /// Committed files.
    pub files: usize,
    /// Committed bytes.
    pub bytes: u64,
    pub elapsed: Duration,
}

/// Runs the stages against one index.
pub struct Orchestrator {
    config: Arc<VersionerConfig>,
    index: SharedIndex,
    log: Arc<dyn BuildLog>,
}

impl Orchestrator {
    pub fn new(config: Arc<VersionerConfig>, index: SharedIndex, log: Arc<dyn BuildLog>) -> Self {
        Self { config, index, log }
    }

    /// Run every configured stage.
    pub async fn run(&self) -> Result<BuildSummary, BuildError> {
        let start = Instant::now();
        let mut summary = BuildSummary::default();

        let result = self.run_stages(&mut summary).await;

        if !self.config.cache_files {
            self.index.write().release_buffers();
        }

        summary.elapsed = start.elapsed();
        match &result {
            Ok(()) => self.log.verbose(&format!(
                "Build duration: {}ms, files: {}, total size: {} bytes",
                summary.elapsed.as_millis(),
                summary.files,
                summary.bytes
            )),
            Err(e) => self.log.error("Build failed", Some(e)),
        }

        result.map(|()| summary)
    }

    async fn run_stages(&self, summary: &mut BuildSummary) -> Result<(), BuildError> {
        let mut stage = Stage::first();
        while let Some(class) = stage.class() {
            match self.config.type_config(class) {
                Some(config) => self.run_stage(class, config, summary).await?,
                None => self.log.verbose(&format!("Skipping {class}: not configured")),
            }
            stage = stage.next();
        }
        Ok(())
    }

    fn chain_for(&self, class: AssetClass) -> ProcessorChain {
        match class {
            AssetClass::Style => ProcessorChain::new().pipe(StyleRewriter::new(
                &self.config,
                Arc::clone(&self.index),
                Arc::clone(&self.log),
            )),
            AssetClass::Image | AssetClass::Script => ProcessorChain::new(),
        }
    }

    async fn run_stage(
        &self,
        class: AssetClass,
        config: &TypeConfig,
        summary: &mut BuildSummary,
    ) -> Result<(), BuildError> {
        let report = scan::load(class, config, &self.log).await;
        if let Some(first) = report.failures.into_iter().next() {
            return Err(first);
        }

        self.log
            .verbose(&format!("Processing {class}: {} files", report.files.len()));

        let chain = Arc::new(self.chain_for(class));
        let extension = self.config.extension_for(class).map(str::to_string);
        let mut pending = report.files.into_iter();
        let mut tasks = JoinSet::new();
        let mut first_error = None;

        loop {
            while first_error.is_none() && tasks.len() < PROCESS_CONCURRENCY {
                let Some(file) = pending.next() else { break };
                let chain = Arc::clone(&chain);
                tasks.spawn(async move {
                    let bytes = chain.apply(file.bytes, &file.logical).await?;
                    Ok::<_, BuildError>((file.origin, file.logical, bytes))
                });
            }

            let Some(joined) = tasks.join_next().await else {
                break;
            };
            match joined.map_err(BuildError::from).and_then(|r| r) {
                Ok((origin, logical, bytes)) => {
                    self.commit(class, &origin, logical, bytes, extension.as_deref(), summary);
                }
                Err(e) => {
                    let message = match e.file() {
                        Some(file) => format!("Failed to add {class} file: {file}"),
                        None => format!("Failed to add {class} file"),
                    };
                    self.log.error(&message, Some(&e));
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Derive the key and publish the record, then the path, under one
    /// write lock.
    fn commit(
        &self,
        class: AssetClass,
        origin: &Origin,
        logical: LogicalPath,
        bytes: Vec<u8>,
        extension: Option<&str>,
        summary: &mut BuildSummary,
    ) {
        let key = derive_key(&logical, &bytes, extension, self.config.hash);
        let path = match extension {
            Some(ext) => logical.with_extension(ext),
            None => logical,
        };

        summary.files += 1;
        summary.bytes += bytes.len() as u64;
        self.log.verbose(&format!("Added {class}: {path} -> {key} ({origin})"));

        self.index.write().commit(class, path, key, bytes);
    }
}
