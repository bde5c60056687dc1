//! Versioner configuration.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── file.rs    # hashmark.toml format, path resolution, diagnostics
//! ├── util.rs    # config file discovery
//! └── mod.rs     # VersionerConfig, TypeConfig, FileEntry (this file)
//! ```
//!
//! Configuration is either loaded from `hashmark.toml` or assembled in code:
//!
//! ```ignore
//! let config = VersionerConfig::new("/assets")
//!     .cache_files(true)
//!     .image(TypeConfig::default().root("public/images"))
//!     .style(TypeConfig::default().root("public/css").compiler(CompilerSpec::less()));
//! ```

mod file;
mod util;

pub use file::{ConfigFile, FileSection, ServeConfig, TypeSection, load_config};
pub use util::find_config_file;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::asset::{AssetClass, HashAlgorithm, LogicalPath};
use crate::pipeline::{CompilerSpec, MissingReferencePolicy};

/// Default config file name.
pub const CONFIG_FILE: &str = "hashmark.toml";

/// Extension forced on style output when none is configured.
pub const STYLE_EXTENSION: &str = ".css";

// ============================================================================
// file entries
// ============================================================================

/// Where an explicit entry's bytes come from.
#[derive(Debug, Clone)]
pub enum FileSource {
    Path(PathBuf),
    Bytes(Arc<[u8]>),
}

/// An explicitly listed file, served under `path`.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub source: FileSource,
    pub path: LogicalPath,
}

impl FileEntry {
    /// File read from disk at build time.
    pub fn path(source: impl Into<PathBuf>, logical: &str) -> Self {
        Self {
            source: FileSource::Path(source.into()),
            path: LogicalPath::new(logical),
        }
    }

    /// In-memory buffer; no disk I/O.
    pub fn bytes(data: impl Into<Arc<[u8]>>, logical: &str) -> Self {
        Self {
            source: FileSource::Bytes(data.into()),
            path: LogicalPath::new(logical),
        }
    }
}

// ============================================================================
// per-class configuration
// ============================================================================

/// Settings for one asset class.
#[derive(Debug, Clone, Default)]
pub struct TypeConfig {
    /// Directory scanned recursively.
    pub root: Option<PathBuf>,
    /// Explicit entries, appended after root entries.
    pub files: Vec<FileEntry>,
    /// Per-class URL prefix, overriding the top-level one.
    pub url_root: Option<String>,
    /// Output extension override, with leading dot.
    pub versioned_extension: Option<String>,
    /// Style compiler. `None` means plain CSS.
    pub compiler: Option<CompilerSpec>,
    /// What to substitute for unresolved image references.
    pub missing_reference: MissingReferencePolicy,
    /// Upper bound for one compiler invocation.
    pub compiler_timeout: Option<Duration>,
    /// `lessc` executable; looked up on `PATH` when unset.
    pub lessc: Option<PathBuf>,
}

impl TypeConfig {
    pub fn root(mut self, root: impl AsRef<Path>) -> Self {
        self.root = Some(root.as_ref().to_path_buf());
        self
    }

    pub fn file(mut self, entry: FileEntry) -> Self {
        self.files.push(entry);
        self
    }

    pub fn url_root(mut self, url_root: impl Into<String>) -> Self {
        self.url_root = Some(url_root.into());
        self
    }

    /// Accepts `css` or `.css`.
    pub fn versioned_extension(mut self, ext: &str) -> Self {
        self.versioned_extension = Some(normalize_extension(ext));
        self
    }

    pub fn compiler(mut self, compiler: CompilerSpec) -> Self {
        self.compiler = Some(compiler);
        self
    }

    pub fn missing_reference(mut self, policy: MissingReferencePolicy) -> Self {
        self.missing_reference = policy;
        self
    }

    pub fn compiler_timeout(mut self, timeout: Duration) -> Self {
        self.compiler_timeout = Some(timeout);
        self
    }

    pub fn lessc(mut self, program: impl Into<PathBuf>) -> Self {
        self.lessc = Some(program.into());
        self
    }
}

/// Ensure a leading dot; empty stays empty.
pub(crate) fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim();
    if ext.is_empty() || ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{ext}")
    }
}

// ============================================================================
// root configuration
// ============================================================================

/// Complete versioner configuration.
#[derive(Debug, Clone)]
pub struct VersionerConfig {
    /// URL prefix for every class without its own `url_root`.
    pub url_root: String,
    /// Keep processed bytes in memory after the build.
    pub cache_files: bool,
    /// Digest used for keys.
    pub hash: HashAlgorithm,
    pub image: Option<TypeConfig>,
    pub script: Option<TypeConfig>,
    pub style: Option<TypeConfig>,
}

impl Default for VersionerConfig {
    fn default() -> Self {
        Self::new("/")
    }
}

impl VersionerConfig {
    pub fn new(url_root: impl Into<String>) -> Self {
        Self {
            url_root: url_root.into(),
            cache_files: false,
            hash: HashAlgorithm::default(),
            image: None,
            script: None,
            style: None,
        }
    }

    pub fn cache_files(mut self, enabled: bool) -> Self {
        self.cache_files = enabled;
        self
    }

    pub fn hash(mut self, algorithm: HashAlgorithm) -> Self {
        self.hash = algorithm;
        self
    }

    pub fn image(mut self, config: TypeConfig) -> Self {
        self.image = Some(config);
        self
    }

    pub fn script(mut self, config: TypeConfig) -> Self {
        self.script = Some(config);
        self
    }

    pub fn style(mut self, config: TypeConfig) -> Self {
        self.style = Some(config);
        self
    }

    pub fn type_config(&self, class: AssetClass) -> Option<&TypeConfig> {
        match class {
            AssetClass::Image => self.image.as_ref(),
            AssetClass::Script => self.script.as_ref(),
            AssetClass::Style => self.style.as_ref(),
        }
    }

    /// Versioned extension of a class, with the style default applied.
    pub fn extension_for(&self, class: AssetClass) -> Option<&str> {
        let configured = self
            .type_config(class)
            .and_then(|c| c.versioned_extension.as_deref());
        match (configured, class) {
            (Some(ext), _) => Some(ext),
            (None, AssetClass::Style) => Some(STYLE_EXTENSION),
            (None, _) => None,
        }
    }

    /// URL prefix of a class.
    pub fn url_root_for(&self, class: AssetClass) -> &str {
        self.type_config(class)
            .and_then(|c| c.url_root.as_deref())
            .unwrap_or(&self.url_root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension("css"), ".css");
        assert_eq!(normalize_extension(".css"), ".css");
        assert_eq!(normalize_extension(""), "");
    }

    #[test]
    fn test_extension_for_style_default() {
        let config = VersionerConfig::default()
            .image(TypeConfig::default())
            .style(TypeConfig::default());
        assert_eq!(config.extension_for(AssetClass::Style), Some(".css"));
        assert_eq!(config.extension_for(AssetClass::Image), None);

        let config = config.style(TypeConfig::default().versioned_extension("min.css"));
        assert_eq!(config.extension_for(AssetClass::Style), Some(".min.css"));
    }

    #[test]
    fn test_url_root_override() {
        let config = VersionerConfig::new("/assets")
            .image(TypeConfig::default())
            .script(TypeConfig::default().url_root("https://cdn.example.com/js"));
        assert_eq!(config.url_root_for(AssetClass::Image), "/assets");
        assert_eq!(config.url_root_for(AssetClass::Script), "https://cdn.example.com/js");
        // Unconfigured classes fall back to the top-level root
        assert_eq!(config.url_root_for(AssetClass::Style), "/assets");
    }

    #[test]
    fn test_file_entry_normalizes_logical_path() {
        let entry = FileEntry::bytes(b"x".to_vec(), "/vendor\\x.js");
        assert_eq!(entry.path.as_str(), "vendor/x.js");
        assert!(matches!(entry.source, FileSource::Bytes(ref b) if &b[..] == b"x"));
    }
}
