//! Asset discovery and loading.
//!
//! Turns one class configuration into loaded `FileDescriptor`s:
//!
//! ```text
//! root/                       explicit files
//! ├── img1.jpg   -> img1.jpg      { source = "vendor/x.png", path = "/x.png" } -> x.png
//! └── dir1/                       { bytes = [..],            path = "y.png"  } -> y.png (no I/O)
//!     └── abc.jpg -> dir1/abc.jpg
//! ```
//!
//! Root entries come first, explicit entries are appended. Disk reads run
//! concurrently, at most `LOAD_CONCURRENCY` at a time. The caller gets the
//! complete `LoadReport` only after every read has finished.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinSet;
use walkdir::WalkDir;

use super::{AssetClass, LogicalPath};
use crate::config::{FileSource, TypeConfig};
use crate::error::BuildError;
use crate::logger::BuildLog;

/// Maximum number of concurrent file reads per stage.
pub const LOAD_CONCURRENCY: usize = 50;

/// Where a descriptor's bytes came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Disk(PathBuf),
    Memory,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disk(path) => write!(f, "{}", path.display()),
            Self::Memory => f.write_str("<memory>"),
        }
    }
}

/// A file ready for processing.
#[derive(Debug, Clone)]
pub struct FileDescriptor {
    pub origin: Origin,
    pub logical: LogicalPath,
    pub bytes: Vec<u8>,
}

/// Result of loading one class.
///
/// Read failures do not stop sibling reads; they are collected here and
/// turned into a stage failure by the orchestrator.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub files: Vec<FileDescriptor>,
    pub failures: Vec<BuildError>,
}

impl LoadReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A file known by name, not yet read.
#[derive(Debug, Clone)]
enum Pending {
    Disk { path: PathBuf, logical: LogicalPath },
    Memory { bytes: Arc<[u8]>, logical: LogicalPath },
}

/// Enumerate every regular file below `root`, recursively.
///
/// Logical paths are relative to `root`. Symlinks are followed.
pub fn scan_root(root: &Path) -> (Vec<(PathBuf, LogicalPath)>, Vec<BuildError>) {
    let mut files = Vec::new();
    let mut errors = Vec::new();

    for entry in WalkDir::new(root).follow_links(true) {
        match entry {
            Ok(entry) if entry.file_type().is_file() => {
                let path = entry.into_path();
                let rel = path.strip_prefix(root).unwrap_or(&path);
                let logical = LogicalPath::from_relative(rel);
                files.push((path, logical));
            }
            Ok(_) => {}
            Err(e) => {
                let path = e.path().unwrap_or(root).to_path_buf();
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::other("filesystem loop detected"));
                errors.push(BuildError::Io { path, source });
            }
        }
    }

    (files, errors)
}

/// Resolve a class configuration into the list of files to load.
fn discover(config: &TypeConfig) -> (Vec<Pending>, Vec<BuildError>) {
    let mut pending = Vec::new();
    let mut errors = Vec::new();

    if let Some(root) = &config.root {
        let (files, scan_errors) = scan_root(root);
        pending.extend(
            files
                .into_iter()
                .map(|(path, logical)| Pending::Disk { path, logical }),
        );
        errors.extend(scan_errors);
    }

    for entry in &config.files {
        pending.push(match &entry.source {
            FileSource::Path(path) => Pending::Disk {
                path: path.clone(),
                logical: entry.path.clone(),
            },
            FileSource::Bytes(bytes) => Pending::Memory {
                bytes: Arc::clone(bytes),
                logical: entry.path.clone(),
            },
        });
    }

    (pending, errors)
}

/// Read one file. `Ok(None)` means the source is a directory.
async fn read_one(path: PathBuf, logical: LogicalPath) -> Result<Option<FileDescriptor>, BuildError> {
    let read = match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_dir() => return Ok(None),
        _ => tokio::fs::read(&path).await,
    };

    match read {
        Ok(bytes) => Ok(Some(FileDescriptor {
            origin: Origin::Disk(path),
            logical,
            bytes,
        })),
        Err(e) if e.kind() == io::ErrorKind::IsADirectory => Ok(None),
        Err(source) => Err(BuildError::Io { path, source }),
    }
}

/// Load every file of one class.
pub async fn load(class: AssetClass, config: &TypeConfig, log: &Arc<dyn BuildLog>) -> LoadReport {
    let (pending, scan_errors) = discover(config);
    let mut report = LoadReport {
        files: Vec::with_capacity(pending.len()),
        failures: scan_errors,
    };

    if let Some(root) = &config.root {
        log.verbose(&format!("Loading {class}: {}, files: {}", root.display(), pending.len()));
    }

    let mut reads = JoinSet::new();
    for item in pending {
        match item {
            Pending::Memory { bytes, logical } => report.files.push(FileDescriptor {
                origin: Origin::Memory,
                logical,
                bytes: bytes.to_vec(),
            }),
            Pending::Disk { path, logical } => {
                while reads.len() >= LOAD_CONCURRENCY {
                    if let Some(joined) = reads.join_next().await {
                        absorb(&mut report, joined, log);
                    }
                }
                reads.spawn(read_one(path, logical));
            }
        }
    }

    while let Some(joined) = reads.join_next().await {
        absorb(&mut report, joined, log);
    }

    report
}

fn absorb(
    report: &mut LoadReport,
    joined: Result<Result<Option<FileDescriptor>, BuildError>, tokio::task::JoinError>,
    log: &Arc<dyn BuildLog>,
) {
    match joined {
        Ok(Ok(Some(file))) => report.files.push(file),
        Ok(Ok(None)) => log.verbose("Skipped directory entry"),
        Ok(Err(e)) => {
            log.error("Failed to add file", Some(&e));
            report.failures.push(e);
        }
        Err(e) => report.failures.push(BuildError::Join(e)),
    }
}
