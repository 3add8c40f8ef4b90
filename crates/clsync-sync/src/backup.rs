//! Backup snapshot
//!
//! Copies the configured subset of the working tree verbatim to a
//! timestamped sibling directory before a destructive pull. The caller
//! decides when to invoke this (typically after a preview shows
//! overwrites); the pull itself never backs up implicitly. Any failure
//! aborts with an error and the pull must not proceed.

use std::path::{Path, PathBuf};

use chrono::Utc;
use clsync_conflict::sidecar::TIMESTAMP_FORMAT;
use tracing::info;

use crate::error::SyncError;
use crate::walker::walk_tree;

const BACKUP_DIR_MODE: u32 = 0o755;
const BACKUP_FILE_MODE: u32 = 0o644;

/// Snapshot every walker-visible file into
/// `<tree_root>.backup.<YYYYMMDD-HHMMSS>` and return that directory
pub async fn create_backup(
    tree_root: &Path,
    sync_paths: &[String],
) -> Result<PathBuf, SyncError> {
    use std::os::unix::fs::PermissionsExt;

    let timestamp = Utc::now().format(TIMESTAMP_FORMAT);
    let backup_root = {
        let mut p = tree_root.as_os_str().to_owned();
        p.push(format!(".backup.{timestamp}"));
        PathBuf::from(p)
    };

    tokio::fs::create_dir_all(&backup_root).await?;
    tokio::fs::set_permissions(&backup_root, std::fs::Permissions::from_mode(BACKUP_DIR_MODE))
        .await?;

    let files = walk_tree(tree_root, sync_paths).await?;
    for path in files.keys() {
        let src = path.to_path(tree_root);
        let dst = path.to_path(&backup_root);

        if let Some(parent) = dst.parent() {
            tokio::fs::create_dir_all(parent).await?;
            tokio::fs::set_permissions(parent, std::fs::Permissions::from_mode(BACKUP_DIR_MODE))
                .await?;
        }
        tokio::fs::copy(&src, &dst).await?;
        tokio::fs::set_permissions(&dst, std::fs::Permissions::from_mode(BACKUP_FILE_MODE))
            .await?;
    }

    info!(
        backup_root = %backup_root.display(),
        files = files.len(),
        "backup snapshot created"
    );
    Ok(backup_root)
}
