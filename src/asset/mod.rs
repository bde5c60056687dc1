//! Asset classes, keys, loading and the versioned index.

mod class;
pub mod hash;
pub mod index;
mod path;
pub mod scan;

// Types
pub use class::AssetClass;
pub use path::{LogicalPath, versioned_url};

// Hashing (pure functions)
pub use hash::{HashAlgorithm, derive_key, final_extension};

// Index
pub use index::{AssetIndex, Manifest, SharedIndex, VersionedAssetRecord};

// Loading (side effects)
pub use scan::{FileDescriptor, LoadReport, Origin};
