//! Content-hash asset versioning.
//!
//! Images, scripts and stylesheets are loaded, processed and committed under
//! keys derived from their bytes (`abc.629f545a3f7cea350715263cd5ef3012.jpg`),
//! so every URL can be cached forever.
//!
//! # Module Structure
//!
//! ```text
//! src/
//! ├── asset/       # classes, logical paths, hashing, loading, the index
//! ├── pipeline/    # processor chain, stylesheet rewriting, compilers
//! ├── build/       # stage orchestration, saving, manifests
//! ├── serve/       # HTTP delivery of versioned files
//! ├── config/      # VersionerConfig and hashmark.toml
//! ├── versioner.rs # public facade
//! ├── error.rs     # ConfigError, BuildError
//! └── logger.rs    # BuildLog, log!/debug! macros
//! ```

pub mod asset;
pub mod build;
pub mod config;
pub mod error;
pub mod logger;
pub mod pipeline;
pub mod serve;
pub mod utils;
mod versioner;

pub use asset::{AssetClass, HashAlgorithm, LogicalPath, VersionedAssetRecord};
pub use build::BuildSummary;
pub use config::{FileEntry, FileSource, TypeConfig, VersionerConfig};
pub use error::{BuildError, ConfigError};
pub use logger::{BuildLog, ConsoleLog, SilentLog};
pub use pipeline::{CompilerSpec, MissingReferencePolicy};
pub use serve::{AssetServer, Delivery};
pub use versioner::Versioner;
