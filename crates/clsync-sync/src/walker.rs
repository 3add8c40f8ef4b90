//! Tree walker
//!
//! Enumerates the configured subset of the working tree as a map from
//! forward-slash relative path to file metadata. Rules:
//! - sync-path entries that do not exist are skipped silently
//! - a regular-file entry contributes itself; a directory entry
//!   contributes every regular file beneath it
//! - symlinks are never followed and never reported, at any depth
//! - conflict sidecars are skipped
//! - any other per-entry I/O error fails the whole walk
//!
//! The result is a `BTreeMap`, so iteration order is deterministic for a
//! given tree.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use clsync_core::domain::RelPath;
use clsync_conflict::sidecar::is_sidecar;
use tracing::{debug, warn};

use crate::error::SyncError;

/// Metadata of one working-tree file as seen by the walker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMeta {
    /// Byte length
    pub size: u64,
    /// Last-modification instant
    pub modified: DateTime<Utc>,
}

/// Enumerate all regular files reachable through the sync-path set
pub async fn walk_tree(
    tree_root: &Path,
    sync_paths: &[String],
) -> Result<BTreeMap<RelPath, FileMeta>, SyncError> {
    let mut files = BTreeMap::new();

    for name in sync_paths {
        let full = tree_root.join(name);
        let meta = match tokio::fs::symlink_metadata(&full).await {
            Ok(meta) => meta,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
            Err(err) => return Err(err.into()),
        };

        if meta.file_type().is_symlink() {
            continue;
        }
        if meta.is_dir() {
            walk_directory(&full, name, &mut files).await?;
        } else if meta.is_file() {
            if is_sidecar(name) {
                continue;
            }
            files.insert(
                RelPath::new(name.as_str())?,
                FileMeta {
                    size: meta.len(),
                    modified: modified_time(&meta)?,
                },
            );
        }
    }

    debug!(files = files.len(), "tree walk complete");
    Ok(files)
}

fn walk_directory<'a>(
    dir: &'a Path,
    rel_prefix: &'a str,
    files: &'a mut BTreeMap<RelPath, FileMeta>,
) -> Pin<Box<dyn Future<Output = Result<(), SyncError>> + Send + 'a>> {
    Box::pin(async move {
        let mut entries = tokio::fs::read_dir(dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            if file_type.is_symlink() {
                continue;
            }

            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    // Bucket keys are UTF-8; a name that cannot be
                    // represented remotely is not syncable.
                    warn!(name = ?raw, "skipping non-UTF-8 file name");
                    continue;
                }
            };
            let rel = format!("{rel_prefix}/{name}");

            if file_type.is_dir() {
                walk_directory(&entry.path(), &rel, files).await?;
            } else if file_type.is_file() {
                if is_sidecar(&name) {
                    continue;
                }
                let meta = entry.metadata().await?;
                files.insert(
                    RelPath::new(rel)?,
                    FileMeta {
                        size: meta.len(),
                        modified: modified_time(&meta)?,
                    },
                );
            }
        }

        Ok(())
    })
}

fn modified_time(meta: &std::fs::Metadata) -> Result<DateTime<Utc>, SyncError> {
    Ok(DateTime::<Utc>::from(meta.modified()?))
}
