//! Persistent per-device sync state
//!
//! One JSON file per device, recording for every tracked path the
//! fingerprint, size and mtime the engine last pushed or accepted, plus
//! the last-operation instants. The file is the device's private memory;
//! devices never exchange state.
//!
//! Saves are atomic (sibling temporary + rename), so a crash never leaves
//! a partial state file. Instants serialize as ISO-8601; "never" is null.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use clsync_core::domain::{ContentHash, RelPath};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SyncError;

/// State file permissions: path names and timestamps are nobody else's
/// business.
const STATE_FILE_MODE: u32 = 0o600;

/// Per-path record of what the engine last pushed or accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileState {
    /// Relative path, primary key
    pub path: RelPath,
    /// Fingerprint of the bytes last pushed or accepted
    pub hash: ContentHash,
    /// Byte length at the time the record was written
    pub size: u64,
    /// Working-tree mtime at the time the record was written
    pub mod_time: DateTime<Utc>,
    /// High-water mark: remote changes at or below this instant are
    /// already known. `None` means never synced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded: Option<DateTime<Utc>>,
}

/// Singleton per-device sync state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncState {
    #[serde(default)]
    files: BTreeMap<RelPath, FileState>,
    #[serde(default)]
    last_sync: Option<DateTime<Utc>>,
    #[serde(default)]
    device_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_push: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_pull: Option<DateTime<Utc>>,
}

impl SyncState {
    /// Fresh empty state for this device
    #[must_use]
    pub fn new() -> Self {
        Self {
            device_id: device_id(),
            ..Self::default()
        }
    }

    /// Load state from `path`; a missing file yields an empty state
    pub async fn load(path: &Path) -> Result<Self, SyncError> {
        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no state file, starting empty");
                return Ok(Self::new());
            }
            Err(err) => return Err(err.into()),
        };

        let mut state: Self = serde_json::from_slice(&data)
            .map_err(|err| SyncError::Other(format!("failed to parse state file: {err}")))?;
        if state.device_id.is_empty() {
            state.device_id = device_id();
        }
        Ok(state)
    }

    /// Persist atomically to `path` (sibling temporary, then rename)
    pub async fn save(&self, path: &Path) -> Result<(), SyncError> {
        let data = serde_json::to_vec_pretty(self)
            .map_err(|err| SyncError::Other(format!("failed to serialize state: {err}")))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp_path = {
            let mut p = path.as_os_str().to_owned();
            p.push(".tmp");
            std::path::PathBuf::from(p)
        };

        use std::os::unix::fs::PermissionsExt;

        tokio::fs::write(&tmp_path, &data).await?;
        tokio::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(STATE_FILE_MODE))
            .await?;
        tokio::fs::rename(&tmp_path, path).await?;

        debug!(path = %path.display(), files = self.files.len(), "state saved");
        Ok(())
    }

    /// Record (or replace) the tracked entry for `path`
    pub fn update_file(
        &mut self,
        path: RelPath,
        size: u64,
        mod_time: DateTime<Utc>,
        hash: ContentHash,
    ) {
        let uploaded = self.files.get(&path).and_then(|f| f.uploaded);
        self.files.insert(
            path.clone(),
            FileState {
                path,
                hash,
                size,
                mod_time,
                uploaded,
            },
        );
    }

    /// Advance the upload high-water mark for `path`
    ///
    /// The mark never moves backwards, even if `at` is older than the
    /// recorded instant.
    pub fn mark_uploaded(&mut self, path: &RelPath, at: DateTime<Utc>) {
        if let Some(file) = self.files.get_mut(path) {
            file.uploaded = Some(match file.uploaded {
                Some(prev) if prev > at => prev,
                _ => at,
            });
        }
    }

    /// The tracked entry for `path`, if any
    #[must_use]
    pub fn get_file(&self, path: &RelPath) -> Option<&FileState> {
        self.files.get(path)
    }

    /// Drop the tracked entry for `path`
    pub fn remove_file(&mut self, path: &RelPath) {
        self.files.remove(path);
    }

    /// All tracked entries
    #[must_use]
    pub fn files(&self) -> &BTreeMap<RelPath, FileState> {
        &self.files
    }

    /// Whether this device has ever synced anything
    #[must_use]
    pub fn has_state(&self) -> bool {
        !self.files.is_empty()
            || self.last_sync.is_some()
            || self.last_push.is_some()
            || self.last_pull.is_some()
    }

    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    #[must_use]
    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.last_sync
    }

    #[must_use]
    pub fn last_push(&self) -> Option<DateTime<Utc>> {
        self.last_push
    }

    #[must_use]
    pub fn last_pull(&self) -> Option<DateTime<Utc>> {
        self.last_pull
    }

    pub(crate) fn record_push(&mut self, at: DateTime<Utc>) {
        self.last_push = Some(at);
        self.last_sync = Some(at);
    }

    pub(crate) fn record_pull(&mut self, at: DateTime<Utc>) {
        self.last_pull = Some(at);
        self.last_sync = Some(at);
    }

    pub(crate) fn record_sync(&mut self, at: DateTime<Utc>) {
        self.last_sync = Some(at);
    }
}

/// Hostname of this machine; diagnostics only, never correctness
fn device_id() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}
