//! Error types.
//!
//! `ConfigError` signals caller misuse or a bad configuration file and is
//! raised before any asset is touched. `BuildError` is a per-file or
//! per-stage failure raised while the pipeline runs.

use crate::asset::AssetClass;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// ConfigError
// ============================================================================

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config file parsing error")]
    Toml(#[from] toml::de::Error),

    #[error("unknown asset class `{0}` (expected image, script or style)")]
    UnknownClass(String),

    #[error("asset class `{0}` is not configured")]
    ClassNotConfigured(AssetClass),

    #[error("unsupported compiler `{0}` (expected less or lightningcss)")]
    UnknownCompiler(String),

    #[error("set cache_files = true to keep versioned buffers in memory")]
    CacheDisabled,

    // No #[source]: every diagnostic is already in the message
    #[error("config validation failed:\n{}", .0.join("\n"))]
    Diagnostics(Vec<String>),
}

// ============================================================================
// BuildError
// ============================================================================

/// Errors raised while versioning assets.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to read `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write `{}`", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("style compilation failed for `{path}`: {message}")]
    Compile { path: String, message: String },

    #[error("style compiler timed out after {}s for `{path}`", timeout.as_secs_f32())]
    CompileTimeout { path: String, timeout: Duration },

    #[error("`{path}` references missing image `{reference}`")]
    MissingReference { path: String, reference: String },

    #[error("invalid manifest `{}`", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("asset task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl BuildError {
    /// Logical path of the file the error belongs to, if any.
    pub fn file(&self) -> Option<String> {
        match self {
            Self::Io { path, .. } | Self::Write { path, .. } | Self::Manifest { path, .. } => {
                Some(path.display().to_string())
            }
            Self::Compile { path, .. }
            | Self::CompileTimeout { path, .. }
            | Self::MissingReference { path, .. } => Some(path.clone()),
            Self::Join(_) | Self::Config(_) => None,
        }
    }
}
