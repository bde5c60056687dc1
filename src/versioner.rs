//! Public entry point.
//!
//! ```ignore
//! let versioner = Versioner::new(config, Arc::new(ConsoleLog::new(false)));
//! versioner.build().await?;
//! let url = versioner.image_url("dir1/abc.jpg")?;   // Some("/assets/abc.629f...jpg")
//! ```
//!
//! URL lookups read the index under a short read lock and may be called
//! from any thread while no build is running.

use std::path::Path;
use std::sync::Arc;

use crate::asset::{AssetClass, AssetIndex, LogicalPath, SharedIndex, VersionedAssetRecord, versioned_url};
use crate::build::{self, BuildSummary, Orchestrator};
use crate::config::VersionerConfig;
use crate::error::{BuildError, ConfigError};
use crate::logger::BuildLog;
use crate::serve::Delivery;

pub struct Versioner {
    config: Arc<VersionerConfig>,
    index: SharedIndex,
    log: Arc<dyn BuildLog>,
}

impl Versioner {
    pub fn new(config: VersionerConfig, log: Arc<dyn BuildLog>) -> Self {
        Self {
            config: Arc::new(config),
            index: AssetIndex::shared(),
            log,
        }
    }

    /// Restore URL resolution from a manifest, without rebuilding.
    ///
    /// Records carry no bytes, so `save_all` writes nothing and delivery
    /// declines every request until the next `build`.
    pub async fn from_manifest(
        config: VersionerConfig,
        manifest: &Path,
        log: Arc<dyn BuildLog>,
    ) -> Result<Self, BuildError> {
        let manifest = build::read_manifest(manifest).await?;
        let index = AssetIndex::from_manifest(&manifest)?;
        Ok(Self {
            config: Arc::new(config),
            index: Arc::new(parking_lot::RwLock::new(index)),
            log,
        })
    }

    pub fn config(&self) -> &VersionerConfig {
        &self.config
    }

    pub fn is_caching_files(&self) -> bool {
        self.config.cache_files
    }

    /// Version every configured asset, replacing the previous index.
    pub async fn build(&self) -> Result<BuildSummary, BuildError> {
        *self.index.write() = AssetIndex::new();
        Orchestrator::new(
            Arc::clone(&self.config),
            Arc::clone(&self.index),
            Arc::clone(&self.log),
        )
        .run()
        .await
    }

    /// Versioned URL of a logical path.
    ///
    /// `Ok(None)` when the path was never committed; `Err` when the class is
    /// not configured at all.
    pub fn url(&self, path: &str, class: AssetClass) -> Result<Option<String>, ConfigError> {
        let key = self.key_for(path, class)?;
        Ok(key.map(|key| versioned_url(self.config.url_root_for(class), &key)))
    }

    /// Like `url`, with the class given by name (`image`, `js`, `css`, ...).
    pub fn url_for(&self, path: &str, class: &str) -> Result<Option<String>, ConfigError> {
        self.url(path, class.parse()?)
    }

    pub fn image_url(&self, path: &str) -> Result<Option<String>, ConfigError> {
        self.url(path, AssetClass::Image)
    }

    pub fn script_url(&self, path: &str) -> Result<Option<String>, ConfigError> {
        self.url(path, AssetClass::Script)
    }

    pub fn style_url(&self, path: &str) -> Result<Option<String>, ConfigError> {
        self.url(path, AssetClass::Style)
    }

    /// Versioned key of a logical path.
    ///
    /// Style paths are looked up under their versioned extension, so
    /// `site.less` and `site.css` name the same compiled file.
    pub fn key_for(&self, path: &str, class: AssetClass) -> Result<Option<String>, ConfigError> {
        if self.config.type_config(class).is_none() {
            return Err(ConfigError::ClassNotConfigured(class));
        }
        let mut logical = LogicalPath::new(path);
        if let Some(ext) = self.config.extension_for(class) {
            logical = logical.with_extension(ext);
        }
        Ok(self.index.read().key_for(class, &logical).map(str::to_string))
    }

    /// Record for an exact versioned key.
    pub fn get(&self, key: &str) -> Option<VersionedAssetRecord> {
        self.index.read().get(key).cloned()
    }

    /// Write every cached file to `dir/<key>`.
    pub async fn save_all(&self, dir: &Path) -> Result<usize, BuildError> {
        if !self.config.cache_files {
            return Err(ConfigError::CacheDisabled.into());
        }
        build::save_all(&self.index, dir, &self.log).await
    }

    /// Persist the `logical path -> key` mapping.
    pub async fn write_manifest(&self, path: &Path) -> Result<(), BuildError> {
        build::write_manifest(&self.index, path).await
    }

    /// HTTP delivery over this versioner's index.
    pub fn delivery(&self) -> Result<Delivery, ConfigError> {
        if !self.config.cache_files {
            return Err(ConfigError::CacheDisabled);
        }
        Ok(Delivery::new(Arc::clone(&self.index), Arc::clone(&self.log)))
    }

    pub fn index(&self) -> &SharedIndex {
        &self.index
    }
}
