//! `hashmark.toml` file format.
//!
//! # Example
//!
//! ```toml
//! url_root = "http://localhost:5678/assets"
//! cache_files = true
//! hash = "md5"                 # or "blake3"
//!
//! [image]
//! root = "public/images"
//!
//! [style]
//! root = "public/stylesheets"
//! compiler = "less"            # or "lightningcss"
//! missing_reference = "fail"   # "marker" | "empty"
//! compiler_timeout = 30        # seconds
//! lessc = "node_modules/.bin/lessc"
//! files = [{ source = "vendor/reset.css", path = "reset.css" }]
//!
//! [serve]
//! interface = "127.0.0.1"
//! port = 5678
//! fallback = "public"          # static files for non-versioned paths
//! ```
//!
//! Relative paths resolve against the directory holding the config file.

use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use super::{FileEntry, TypeConfig, VersionerConfig};
use crate::asset::{AssetClass, HashAlgorithm};
use crate::error::ConfigError;
use crate::pipeline::{BuiltinCompiler, CompilerSpec, MissingReferencePolicy};

/// Root of the config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub url_root: Option<String>,
    pub cache_files: bool,
    pub hash: HashAlgorithm,
    pub image: Option<TypeSection>,
    pub script: Option<TypeSection>,
    pub style: Option<TypeSection>,
    pub serve: ServeConfig,
}

/// `[image]`, `[script]` or `[style]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TypeSection {
    pub root: Option<PathBuf>,
    pub files: Vec<FileSection>,
    pub url_root: Option<String>,
    pub versioned_extension: Option<String>,
    pub compiler: Option<String>,
    /// Minify output (`lightningcss` only).
    pub minify: bool,
    pub missing_reference: MissingReferencePolicy,
    /// Seconds.
    pub compiler_timeout: Option<u64>,
    /// `lessc` executable. A bare name is looked up on `PATH`.
    pub lessc: Option<PathBuf>,
}

/// One entry of `files = [...]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileSection {
    pub source: PathBuf,
    pub path: String,
}

/// Asset server settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServeConfig {
    /// Network interface to bind.
    /// - `127.0.0.1` (default): localhost only
    /// - `0.0.0.0`: all interfaces
    pub interface: IpAddr,

    /// HTTP port number.
    pub port: u16,

    /// Directory served for paths that are not versioned keys.
    pub fallback: Option<PathBuf>,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 5678,
            fallback: None,
        }
    }
}

impl ConfigFile {
    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse a config file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::parse(&content)
    }

    /// Validate and convert into a runtime configuration.
    ///
    /// Every problem is collected before failing, so one run reports them all.
    pub fn into_config(self, base_dir: &Path) -> Result<(VersionerConfig, ServeConfig), ConfigError> {
        let mut diagnostics = Vec::new();

        let mut config = VersionerConfig::new(self.url_root.unwrap_or_else(|| "/".to_string()))
            .cache_files(self.cache_files)
            .hash(self.hash);

        config.image = self
            .image
            .map(|s| s.into_type_config(AssetClass::Image, base_dir, &mut diagnostics));
        config.script = self
            .script
            .map(|s| s.into_type_config(AssetClass::Script, base_dir, &mut diagnostics));
        config.style = self
            .style
            .map(|s| s.into_type_config(AssetClass::Style, base_dir, &mut diagnostics));

        let mut serve = self.serve;
        serve.fallback = serve.fallback.map(|p| base_dir.join(p));

        if diagnostics.is_empty() {
            Ok((config, serve))
        } else {
            Err(ConfigError::Diagnostics(diagnostics))
        }
    }
}

impl TypeSection {
    fn into_type_config(
        self,
        class: AssetClass,
        base_dir: &Path,
        diagnostics: &mut Vec<String>,
    ) -> TypeConfig {
        let mut config = TypeConfig {
            root: self.root.map(|r| base_dir.join(r)),
            url_root: self.url_root,
            missing_reference: self.missing_reference,
            ..TypeConfig::default()
        };

        if let Some(ext) = self.versioned_extension.as_deref() {
            config = config.versioned_extension(ext);
        }

        for entry in self.files {
            if entry.path.trim().is_empty() {
                diagnostics.push(format!(
                    "[{class}.files] entry `{}` has an empty path",
                    entry.source.display()
                ));
                continue;
            }
            config
                .files
                .push(FileEntry::path(base_dir.join(entry.source), &entry.path));
        }

        if let Some(name) = self.compiler {
            if class != AssetClass::Style {
                diagnostics.push(format!("[{class}.compiler] only the style class is compiled"));
            }
            match name.parse::<BuiltinCompiler>() {
                Ok(BuiltinCompiler::Lightning { .. }) => {
                    config.compiler = Some(CompilerSpec::lightning(self.minify));
                }
                Ok(builtin) => {
                    if self.minify {
                        diagnostics.push(format!("[{class}.minify] requires compiler = \"lightningcss\""));
                    }
                    config.compiler = Some(CompilerSpec::Builtin(builtin));
                }
                Err(e) => diagnostics.push(format!("[{class}.compiler] {e}")),
            }
        } else if self.minify {
            diagnostics.push(format!("[{class}.minify] requires compiler = \"lightningcss\""));
        }

        if let Some(program) = self.lessc {
            if !matches!(config.compiler, Some(CompilerSpec::Builtin(BuiltinCompiler::Less))) {
                diagnostics.push(format!("[{class}.lessc] requires compiler = \"less\""));
            }
            config.lessc = Some(resolve_program(base_dir, program));
        }

        match self.compiler_timeout {
            Some(0) => diagnostics.push(format!("[{class}.compiler_timeout] must be at least 1 second")),
            Some(secs) => config.compiler_timeout = Some(Duration::from_secs(secs)),
            None => {}
        }

        config
    }
}

/// Bare names stay as-is for `PATH` lookup; anything with a separator
/// resolves against the config directory.
fn resolve_program(base_dir: &Path, program: PathBuf) -> PathBuf {
    if program.components().count() > 1 {
        base_dir.join(program)
    } else {
        program
    }
}

/// Load a config file; relative paths resolve against its directory.
pub fn load_config(path: &Path) -> Result<(VersionerConfig, ServeConfig), ConfigError> {
    let base_dir = path.parent().unwrap_or(Path::new("."));
    ConfigFile::from_path(path)?.into_config(base_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileSource;

    fn convert(toml: &str) -> Result<(VersionerConfig, ServeConfig), ConfigError> {
        ConfigFile::parse(toml)?.into_config(Path::new("/site"))
    }

    #[test]
    fn test_full_config() {
        let (config, serve) = convert(
            r#"
            url_root = "http://localhost:5678/assets"
            cache_files = true
            hash = "blake3"

            [image]
            root = "public/images"

            [script]
            root = "/abs/js"
            url_root = "https://cdn.example.com/js"

            [style]
            root = "public/css"
            compiler = "less"
            missing_reference = "marker"
            compiler_timeout = 30
            files = [{ source = "vendor/reset.css", path = "/reset.css" }]

            [serve]
            interface = "0.0.0.0"
            port = 8080
            fallback = "public"
            "#,
        )
        .unwrap();

        assert_eq!(config.url_root, "http://localhost:5678/assets");
        assert!(config.cache_files);
        assert_eq!(config.hash, HashAlgorithm::Blake3);

        let image = config.image.as_ref().unwrap();
        assert_eq!(image.root.as_deref(), Some(Path::new("/site/public/images")));

        let script = config.script.as_ref().unwrap();
        assert_eq!(script.root.as_deref(), Some(Path::new("/abs/js")));
        assert_eq!(config.url_root_for(AssetClass::Script), "https://cdn.example.com/js");

        let style = config.style.as_ref().unwrap();
        assert!(matches!(style.compiler, Some(CompilerSpec::Builtin(BuiltinCompiler::Less))));
        assert_eq!(style.missing_reference, MissingReferencePolicy::Marker);
        assert_eq!(style.compiler_timeout, Some(Duration::from_secs(30)));
        assert_eq!(style.files.len(), 1);
        assert_eq!(style.files[0].path.as_str(), "reset.css");
        assert!(matches!(
            &style.files[0].source,
            FileSource::Path(p) if p == Path::new("/site/vendor/reset.css")
        ));

        assert_eq!(serve.interface, IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        assert_eq!(serve.port, 8080);
        assert_eq!(serve.fallback.as_deref(), Some(Path::new("/site/public")));
    }

    #[test]
    fn test_defaults() {
        let (config, serve) = convert("").unwrap();
        assert_eq!(config.url_root, "/");
        assert!(!config.cache_files);
        assert_eq!(config.hash, HashAlgorithm::Md5);
        assert!(config.image.is_none());
        assert_eq!(serve.port, 5678);
        assert_eq!(serve.interface, IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[test]
    fn test_lightning_minify() {
        let (config, _) = convert("[style]\ncompiler = \"lightningcss\"\nminify = true").unwrap();
        assert!(matches!(
            config.style.unwrap().compiler,
            Some(CompilerSpec::Builtin(BuiltinCompiler::Lightning { minify: true }))
        ));
    }

    #[test]
    fn test_diagnostics_are_collected() {
        let err = convert(
            r#"
            [image]
            compiler = "less"

            [style]
            compiler = "sass"
            compiler_timeout = 0
            "#,
        )
        .unwrap_err();

        let ConfigError::Diagnostics(diags) = err else {
            panic!("expected diagnostics, got {err:?}");
        };
        assert_eq!(diags.len(), 3);
        assert!(diags.iter().any(|d| d.contains("[image.compiler]")));
        assert!(diags.iter().any(|d| d.contains("sass")));
        assert!(diags.iter().any(|d| d.contains("[style.compiler_timeout]")));
    }

    #[test]
    fn test_lessc_program() {
        let (config, _) = convert("[style]\ncompiler = \"less\"\nlessc = \"node_modules/.bin/lessc\"").unwrap();
        assert_eq!(
            config.style.unwrap().lessc.as_deref(),
            Some(Path::new("/site/node_modules/.bin/lessc"))
        );

        let (config, _) = convert("[style]\ncompiler = \"less\"\nlessc = \"lessc4\"").unwrap();
        assert_eq!(config.style.unwrap().lessc.as_deref(), Some(Path::new("lessc4")));

        let err = convert("[style]\nlessc = \"lessc\"").unwrap_err();
        assert!(matches!(err, ConfigError::Diagnostics(ref d) if d[0].contains("[style.lessc]")));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = convert("[image]\nrot = \"typo\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_unknown_hash_rejected() {
        assert!(matches!(convert("hash = \"sha1\""), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_load_config_resolves_against_file_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("hashmark.toml");
        fs::write(&path, "[image]\nroot = \"img\"").unwrap();

        let (config, _) = load_config(&path).unwrap();
        assert_eq!(config.image.unwrap().root, Some(dir.path().join("img")));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Path::new("/definitely/not/here/hashmark.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(..)));
    }
}
