//! Writing versioned files and manifests to disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinSet;

use crate::asset::{Manifest, SharedIndex};
use crate::error::BuildError;
use crate::logger::BuildLog;

/// Maximum number of concurrent file writes.
pub const SAVE_CONCURRENCY: usize = 100;

/// Write `dir/<key>` for every record that still holds bytes.
///
/// Returns the number of files written. Creates `dir` when missing.
pub async fn save_all(index: &SharedIndex, dir: &Path, log: &Arc<dyn BuildLog>) -> Result<usize, BuildError> {
    log.verbose(&format!("Saving versioned files to: {}", dir.display()));

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| BuildError::Write {
            path: dir.to_path_buf(),
            source,
        })?;

    // Snapshot under the read lock; no guard crosses an await
    let pending: Vec<(PathBuf, Arc<[u8]>)> = {
        let index = index.read();
        index
            .records()
            .filter_map(|r| r.bytes.clone().map(|b| (dir.join(&r.key), b)))
            .collect()
    };

    let mut pending = pending.into_iter();
    let mut tasks = JoinSet::new();
    let mut written = 0;
    let mut first_error = None;

    loop {
        while first_error.is_none() && tasks.len() < SAVE_CONCURRENCY {
            let Some((path, bytes)) = pending.next() else { break };
            tasks.spawn(async move {
                match tokio::fs::write(&path, &bytes).await {
                    Ok(()) => Ok(path),
                    Err(source) => Err(BuildError::Write { path, source }),
                }
            });
        }

        let Some(joined) = tasks.join_next().await else {
            break;
        };
        match joined.map_err(BuildError::from).and_then(|r| r) {
            Ok(path) => {
                written += 1;
                log.verbose(&format!("Saved: {}", path.display()));
            }
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) => {
            log.error("Failed to save versioned assets", Some(&e));
            Err(e)
        }
        None => Ok(written),
    }
}

/// Write the `logical path -> key` manifest as pretty JSON.
pub async fn write_manifest(index: &SharedIndex, path: &Path) -> Result<(), BuildError> {
    let manifest = index.read().to_manifest();
    let json = serde_json::to_vec_pretty(&manifest).map_err(|source| BuildError::Manifest {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| BuildError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    tokio::fs::write(path, json)
        .await
        .map_err(|source| BuildError::Write {
            path: path.to_path_buf(),
            source,
        })
}

/// Read a manifest written by `write_manifest`.
pub async fn read_manifest(path: &Path) -> Result<Manifest, BuildError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| BuildError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| BuildError::Manifest {
        path: path.to_path_buf(),
        source,
    })
}
