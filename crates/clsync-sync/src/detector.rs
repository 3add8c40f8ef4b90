//! Local change detection
//!
//! Diffs the walker's view of the working tree against the persistent
//! state:
//! - a walked path with no state record is an `Add`
//! - a walked path whose fingerprint differs from the record is a `Modify`
//! - a state record whose path the walker did not observe is a `Delete`
//!
//! Fingerprints are recomputed on every run; mtimes are carried along for
//! bookkeeping but never decide anything.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use clsync_core::domain::{ContentHash, RelPath};

use crate::digest;
use crate::error::SyncError;
use crate::state::SyncState;
use crate::walker::FileMeta;

/// What happened to a path since the last sync
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Present locally, unknown to the state
    Add,
    /// Present locally with a different fingerprint
    Modify,
    /// Tracked in state but gone from the tree
    Delete,
}

/// One detected change
#[derive(Debug, Clone)]
pub struct Change {
    pub path: RelPath,
    pub kind: ChangeKind,
    /// Current fingerprint; `None` for deletes
    pub hash: Option<ContentHash>,
    /// Current byte length; zero for deletes
    pub size: u64,
    /// Current mtime; `None` for deletes
    pub mod_time: Option<DateTime<Utc>>,
}

/// Diff the walked tree against the state
///
/// Emits adds and modifies in walk order, then deletes in state order.
/// Callers must not depend on the ordering beyond its determinism.
pub async fn detect_changes(
    tree_root: &Path,
    local: &BTreeMap<RelPath, FileMeta>,
    state: &SyncState,
) -> Result<Vec<Change>, SyncError> {
    let mut changes = Vec::new();

    for (path, meta) in local {
        let hash = digest::hash_file(&path.to_path(tree_root)).await?;

        match state.get_file(path) {
            None => changes.push(Change {
                path: path.clone(),
                kind: ChangeKind::Add,
                hash: Some(hash),
                size: meta.size,
                mod_time: Some(meta.modified),
            }),
            Some(record) if record.hash != hash => changes.push(Change {
                path: path.clone(),
                kind: ChangeKind::Modify,
                hash: Some(hash),
                size: meta.size,
                mod_time: Some(meta.modified),
            }),
            Some(_) => {}
        }
    }

    for path in state.files().keys() {
        if !local.contains_key(path) {
            changes.push(Change {
                path: path.clone(),
                kind: ChangeKind::Delete,
                hash: None,
                size: 0,
                mod_time: None,
            });
        }
    }

    Ok(changes)
}
