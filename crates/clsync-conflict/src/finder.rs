//! Sidecar discovery
//!
//! Walks the configured subset of a working tree and pairs every sidecar
//! with the original path it shadows. Symlinks are never followed.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::ConflictError;
use crate::sidecar::{is_sidecar, parse_sidecar};

/// A discovered conflict: sidecar plus the original it shadows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictFile {
    /// Absolute path of the original file (may not exist any more)
    pub original: PathBuf,
    /// Absolute path of the sidecar holding the unapplied remote version
    pub sidecar: PathBuf,
    /// Conflict instant recovered from the sidecar name, when parseable
    pub timestamp: Option<DateTime<Utc>>,
}

/// Find every conflict sidecar reachable through the sync-path set
pub async fn find_conflicts(
    tree_root: &Path,
    sync_paths: &[String],
) -> Result<Vec<ConflictFile>, ConflictError> {
    let mut conflicts = Vec::new();

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
            scan_directory(&full, &mut conflicts).await?;
        } else if meta.is_file() {
            collect_if_sidecar(&full, &mut conflicts);
        }
    }

    conflicts.sort_by(|a, b| a.sidecar.cmp(&b.sidecar));
    debug!(count = conflicts.len(), "conflict scan complete");
    Ok(conflicts)
}

fn scan_directory<'a>(
    dir: &'a Path,
    conflicts: &'a mut Vec<ConflictFile>,
) -> Pin<Box<dyn Future<Output = Result<(), ConflictError>> + Send + 'a>> {
    Box::pin(async move {
        let mut entries = tokio::fs::read_dir(dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            if file_type.is_symlink() {
                continue;
            }
            if file_type.is_dir() {
                scan_directory(&entry.path(), conflicts).await?;
            } else if file_type.is_file() {
                collect_if_sidecar(&entry.path(), conflicts);
            }
        }

        Ok(())
    })
}

fn collect_if_sidecar(path: &Path, conflicts: &mut Vec<ConflictFile>) {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return;
    };
    if !is_sidecar(name) {
        return;
    }
    let Some(parsed) = parse_sidecar(name) else {
        return;
    };
    let original = path.with_file_name(&parsed.original);
    conflicts.push(ConflictFile {
        original,
        sidecar: path.to_path_buf(),
        timestamp: parsed.timestamp,
    });
}
