//! Versioned asset index.
//!
//! Two maps, both keyed uniquely:
//!
//! ```text
//! (class, logical path) ──► key ──► VersionedAssetRecord { bytes, modified, file_name }
//! ```
//!
//! Every key reachable from the path map exists in the record map. Keys
//! are content-derived and never reassigned; a rebuild starts from a
//! fresh index instead of editing records in place.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::{AssetClass, LogicalPath};
use crate::error::ConfigError;

/// Index shared between the build pipeline and its readers.
///
/// The orchestrator is the only writer. Guards are never held across an
/// `.await`.
pub type SharedIndex = Arc<RwLock<AssetIndex>>;

/// One committed asset.
#[derive(Debug, Clone)]
pub struct VersionedAssetRecord {
    /// Versioned file name (`abc.<hash>.jpg`).
    pub key: String,
    /// Processed bytes; `None` once buffers are released.
    pub bytes: Option<Arc<[u8]>>,
    /// Commit time.
    pub modified: SystemTime,
    /// Display file name used for MIME lookup (`abc.jpg`).
    pub file_name: String,
}

impl VersionedAssetRecord {
    /// Byte count, if the buffer is still held.
    pub fn size(&self) -> Option<usize> {
        self.bytes.as_ref().map(|b| b.len())
    }
}

/// Path-map key: each class has its own namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexPath {
    pub class: AssetClass,
    pub path: LogicalPath,
}

#[derive(Debug, Default)]
pub struct AssetIndex {
    records: HashMap<String, VersionedAssetRecord>,
    paths: HashMap<IndexPath, String>,
}

impl AssetIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a fresh index for sharing.
    pub fn shared() -> SharedIndex {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Commit a processed file under an already derived key.
    ///
    /// `path` is the final logical path (extension override applied).
    /// The record is inserted before the path entry so the path map never
    /// points at a missing key.
    pub fn commit(&mut self, class: AssetClass, path: LogicalPath, key: String, bytes: Vec<u8>) {
        let record = VersionedAssetRecord {
            key: key.clone(),
            bytes: Some(Arc::from(bytes)),
            modified: SystemTime::now(),
            file_name: path.file_name().to_string(),
        };
        self.records.insert(key.clone(), record);
        self.paths.insert(IndexPath { class, path }, key);
    }

    /// Record lookup by exact versioned key.
    pub fn get(&self, key: &str) -> Option<&VersionedAssetRecord> {
        self.records.get(key)
    }

    /// Versioned key committed for a logical path.
    pub fn key_for(&self, class: AssetClass, path: &LogicalPath) -> Option<&str> {
        let lookup = IndexPath {
            class,
            path: path.clone(),
        };
        self.paths.get(&lookup).map(String::as_str)
    }

    /// Record committed for a logical path.
    pub fn record_for(&self, class: AssetClass, path: &LogicalPath) -> Option<&VersionedAssetRecord> {
        self.key_for(class, path).and_then(|key| self.records.get(key))
    }

    /// Drop every buffer, keeping both maps intact.
    pub fn release_buffers(&mut self) {
        for record in self.records.values_mut() {
            record.bytes = None;
        }
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of committed logical paths (may exceed `len()` when files share bytes and stem).
    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    pub fn records(&self) -> impl Iterator<Item = &VersionedAssetRecord> {
        self.records.values()
    }

    /// Snapshot of the path map, grouped by class and sorted.
    pub fn to_manifest(&self) -> Manifest {
        let mut manifest = Manifest::default();
        for (entry, key) in &self.paths {
            manifest
                .classes
                .entry(entry.class.as_str().to_string())
                .or_default()
                .insert(entry.path.as_str().to_string(), key.clone());
        }
        manifest
    }

    /// Rebuild an index from a manifest. Records carry no bytes.
    pub fn from_manifest(manifest: &Manifest) -> Result<Self, ConfigError> {
        let mut index = Self::new();
        let now = SystemTime::now();
        for (class, paths) in &manifest.classes {
            let class: AssetClass = class.parse()?;
            for (path, key) in paths {
                let path = LogicalPath::new(path);
                index
                    .records
                    .entry(key.clone())
                    .or_insert_with(|| VersionedAssetRecord {
                        key: key.clone(),
                        bytes: None,
                        modified: now,
                        file_name: path.file_name().to_string(),
                    });
                index.paths.insert(
                    IndexPath { class, path },
                    key.clone(),
                );
            }
        }
        Ok(index)
    }
}

/// Persisted `logical path -> key` mapping.
///
/// ```json
/// { "image": { "dir1/abc.jpg": "abc.629f545a3f7cea350715263cd5ef3012.jpg" } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    pub classes: BTreeMap<String, BTreeMap<String, String>>,
}
