//! Encrypted push/pull synchronization engine
//!
//! The [`SyncEngine`] mediates one working tree against one encrypted
//! bucket through an abstract [`BlobStore`].
//!
//! ## Operation shapes
//!
//! - **push**: detect local changes, then per change read → encrypt →
//!   upload (or delete the remote key). One-way projection of local
//!   changes; never reads remote state.
//! - **pull**: list the bucket, classify every remote object against the
//!   local file and the state record, then download → decrypt → write, or
//!   materialize a conflict sidecar.
//! - **preview_pull**: the pull classification without any writes.
//! - **verify_key_matches_remote**: decrypt one small existing object to
//!   check the configured identity against the bucket's contents.
//!
//! Per-file failures are collected into the operation's result; only
//! errors that prevent progress abort an operation. State is persisted
//! exactly once per operation, at the end (including on cancellation), so
//! a re-run resumes from whatever per-path successes occurred.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use clsync_conflict::sidecar::sidecar_name;
use clsync_core::config::EngineConfig;
use clsync_core::domain::RelPath;
use clsync_core::ports::blob_store::{BlobStore, ObjectInfo};
use clsync_core::ports::progress::{ProgressAction, ProgressEvent, ProgressFn};
use clsync_crypto::Encryptor;

use crate::backup;
use crate::detector::{detect_changes, Change, ChangeKind};
use crate::digest;
use crate::error::{FileError, SyncError};
use crate::state::SyncState;
use crate::walker::{walk_tree, FileMeta};

/// Probe candidates above this size are skipped when a smaller object
/// exists (keeps the key check cheap).
const PROBE_SIZE_LIMIT: u64 = 10_000;

// ============================================================================
// Operation results
// ============================================================================

/// Summary of a completed push
#[derive(Debug, Default)]
pub struct PushResult {
    pub uploaded: Vec<RelPath>,
    pub deleted: Vec<RelPath>,
    pub errors: Vec<FileError>,
}

impl PushResult {
    /// True when the push did nothing and hit no errors
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.uploaded.is_empty() && self.deleted.is_empty() && self.errors.is_empty()
    }
}

/// Summary of a completed pull
#[derive(Debug, Default)]
pub struct PullResult {
    pub downloaded: Vec<RelPath>,
    pub conflicts: Vec<RelPath>,
    pub errors: Vec<FileError>,
}

impl PullResult {
    /// True when the pull did nothing and hit no errors
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.downloaded.is_empty() && self.conflicts.is_empty() && self.errors.is_empty()
    }
}

/// One row of a pull preview
#[derive(Debug, Clone)]
pub struct PreviewEntry {
    pub path: RelPath,
    pub local_size: Option<u64>,
    pub remote_size: u64,
    pub local_modified: Option<chrono::DateTime<Utc>>,
    pub remote_modified: chrono::DateTime<Utc>,
}

/// What a pull would do, without doing it
#[derive(Debug, Default)]
pub struct PullPreview {
    /// Remote objects with no local counterpart
    pub would_download: Vec<PreviewEntry>,
    /// Clean local files a newer remote would replace
    pub would_overwrite: Vec<PreviewEntry>,
    /// Paths where both sides changed
    pub would_conflict: Vec<PreviewEntry>,
    /// Dirty local files kept because the local side is newer
    pub would_keep: Vec<PreviewEntry>,
    /// Walker paths with no remote object
    pub local_only: Vec<RelPath>,
}

impl PullPreview {
    /// True when a pull would change nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.would_download.is_empty()
            && self.would_overwrite.is_empty()
            && self.would_conflict.is_empty()
    }
}

/// Outcome of the key-match probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyProbe {
    /// The identity decrypts the bucket's contents (or the bucket is empty)
    Match,
    /// The bucket was written under a different identity
    Mismatch,
    /// The bucket could not be consulted; try again later
    Inconclusive,
}

/// Classification of one path in a three-way diff listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffStatus {
    LocalOnly,
    RemoteOnly,
    Modified,
    InSync,
}

/// One row of a three-way diff listing
#[derive(Debug, Clone)]
pub struct DiffEntry {
    pub path: RelPath,
    pub status: DiffStatus,
    pub local_size: Option<u64>,
    pub remote_size: Option<u64>,
    pub local_modified: Option<chrono::DateTime<Utc>>,
    pub remote_modified: Option<chrono::DateTime<Utc>>,
}

// ============================================================================
// Pull classification
// ============================================================================

/// Decision for one remote object during pull
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PullDecision {
    /// Download and write (or overwrite) the local file
    Fetch,
    /// Both sides changed: materialize a sidecar
    Conflict,
    /// Already synced
    SkipInSync,
    /// The local side is newer; the next push will upload it
    SkipLocalNewer,
}

/// The pull decision table.
///
/// `local_clean` and `remote_newer` are only meaningful when the path is
/// present and tracked. A present-but-untracked path conflicts: the engine
/// has no basis to claim either side wins.
fn classify_remote(
    local_present: bool,
    tracked: bool,
    local_clean: bool,
    remote_newer: bool,
) -> PullDecision {
    if !local_present {
        return PullDecision::Fetch;
    }
    if !tracked {
        return PullDecision::Conflict;
    }
    match (local_clean, remote_newer) {
        (true, true) => PullDecision::Fetch,
        (true, false) => PullDecision::SkipInSync,
        (false, true) => PullDecision::Conflict,
        (false, false) => PullDecision::SkipLocalNewer,
    }
}

/// Smallest non-empty object under [`PROBE_SIZE_LIMIT`], else the first
fn select_probe_object(objects: &[ObjectInfo]) -> Option<&ObjectInfo> {
    objects
        .iter()
        .filter(|obj| obj.size > 0 && obj.size < PROBE_SIZE_LIMIT)
        .min_by_key(|obj| obj.size)
        .or_else(|| objects.first())
}

/// Race `fut` against the cancellation token
async fn guard<F, T>(cancel: &CancellationToken, fut: F) -> Result<T, SyncError>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(SyncError::Cancelled),
        value = fut => Ok(value),
    }
}

// ============================================================================
// SyncEngine
// ============================================================================

/// Push/pull engine bound to one tree, one bucket, and one identity
pub struct SyncEngine {
    store: Arc<dyn BlobStore>,
    encryptor: Encryptor,
    state: SyncState,
    config: EngineConfig,
    on_progress: Option<ProgressFn>,
}

impl SyncEngine {
    /// Build an engine from host-provided wiring
    ///
    /// Loads the encryption identity and the persistent state. A missing
    /// identity file is `SyncError::ConfigMissing`; a missing state file
    /// is an empty state.
    pub async fn new(
        config: EngineConfig,
        store: Arc<dyn BlobStore>,
    ) -> Result<Self, SyncError> {
        let encryptor = Encryptor::load(&config.key_path)?;
        let state = SyncState::load(&config.state_path).await?;

        debug!(
            tree_root = %config.tree_root.display(),
            device_id = state.device_id(),
            tracked = state.files().len(),
            "engine ready"
        );

        Ok(Self {
            store,
            encryptor,
            state,
            config,
            on_progress: None,
        })
    }

    /// Install a progress callback
    pub fn set_progress_fn(&mut self, callback: ProgressFn) {
        self.on_progress = Some(callback);
    }

    /// The engine's current state (read-only)
    #[must_use]
    pub fn state(&self) -> &SyncState {
        &self.state
    }

    fn progress(&self, event: ProgressEvent) {
        if let Some(callback) = &self.on_progress {
            callback(&event);
        }
    }

    /// Detect local changes without touching the bucket
    pub async fn status(&self) -> Result<Vec<Change>, SyncError> {
        let local = walk_tree(&self.config.tree_root, &self.config.sync_paths).await?;
        detect_changes(&self.config.tree_root, &local, &self.state).await
    }

    // ========================================================================
    // Push
    // ========================================================================

    /// Project local changes onto the bucket
    #[tracing::instrument(skip(self, cancel))]
    pub async fn push(&mut self, cancel: &CancellationToken) -> Result<PushResult, SyncError> {
        let mut result = PushResult::default();

        self.progress(ProgressEvent::new(ProgressAction::Scan).with_path("detecting changes"));

        let local = guard(
            cancel,
            walk_tree(&self.config.tree_root, &self.config.sync_paths),
        )
        .await??;
        let changes = guard(
            cancel,
            detect_changes(&self.config.tree_root, &local, &self.state),
        )
        .await??;

        if changes.is_empty() {
            self.progress(ProgressEvent::new(ProgressAction::Scan).completed());
            self.state.record_sync(Utc::now());
            self.state.save(&self.config.state_path).await?;
            return Ok(result);
        }

        let total = changes.len();
        let mut cancelled = false;

        for (index, change) in changes.iter().enumerate() {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            match change.kind {
                ChangeKind::Add | ChangeKind::Modify => {
                    self.progress(
                        ProgressEvent::new(ProgressAction::Upload)
                            .with_path(change.path.as_str())
                            .with_size(change.size)
                            .with_progress(index + 1, total),
                    );

                    match self.push_one(change, cancel).await {
                        Ok(()) => result.uploaded.push(change.path.clone()),
                        Err(SyncError::Cancelled) => {
                            cancelled = true;
                            break;
                        }
                        Err(error) => {
                            warn!(path = %change.path, %error, "upload failed");
                            self.progress(
                                ProgressEvent::new(ProgressAction::Upload)
                                    .with_path(change.path.as_str())
                                    .with_error(error.to_string()),
                            );
                            result.errors.push(FileError {
                                path: change.path.clone(),
                                error,
                            });
                        }
                    }
                }
                ChangeKind::Delete => {
                    self.progress(
                        ProgressEvent::new(ProgressAction::Delete)
                            .with_path(change.path.as_str())
                            .with_progress(index + 1, total),
                    );

                    match guard(cancel, self.store.delete(&change.path.remote_key())).await {
                        Err(SyncError::Cancelled) => {
                            cancelled = true;
                            break;
                        }
                        Err(error) => {
                            warn!(path = %change.path, %error, "remote delete failed");
                            // Keep the state record so a retry re-attempts.
                            result.errors.push(FileError {
                                path: change.path.clone(),
                                error,
                            });
                        }
                        Ok(Err(store_err)) => {
                            let error = SyncError::from(store_err);
                            warn!(path = %change.path, %error, "remote delete failed");
                            // Keep the state record so a retry re-attempts.
                            result.errors.push(FileError {
                                path: change.path.clone(),
                                error,
                            });
                        }
                        Ok(Ok(())) => {
                            self.state.remove_file(&change.path);
                            result.deleted.push(change.path.clone());
                        }
                    }
                }
            }
        }

        self.progress(
            ProgressEvent::new(ProgressAction::Upload)
                .with_progress(0, total)
                .completed(),
        );

        if !cancelled {
            self.state.record_push(Utc::now());
        }
        self.state.save(&self.config.state_path).await?;

        if cancelled {
            info!(
                uploaded = result.uploaded.len(),
                deleted = result.deleted.len(),
                "push cancelled; progress persisted"
            );
            return Err(SyncError::Cancelled);
        }

        info!(
            uploaded = result.uploaded.len(),
            deleted = result.deleted.len(),
            errors = result.errors.len(),
            "push complete"
        );
        Ok(result)
    }

    /// Read, encrypt, and upload one file, then update its state record
    async fn push_one(
        &mut self,
        change: &Change,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        let full = change.path.to_path(&self.config.tree_root);

        let data = guard(cancel, tokio::fs::read(&full)).await??;
        let ciphertext = self.encryptor.encrypt(&data)?;
        guard(
            cancel,
            self.store.upload(&change.path.remote_key(), &ciphertext),
        )
        .await??;

        // Fingerprint the bytes that were actually uploaded, not a second
        // read of the file.
        let hash = digest::hash_bytes(&data);
        let mod_time = change.mod_time.unwrap_or_else(Utc::now);
        self.state
            .update_file(change.path.clone(), data.len() as u64, mod_time, hash);
        self.state.mark_uploaded(&change.path, Utc::now());

        Ok(())
    }

    // ========================================================================
    // Pull
    // ========================================================================

    /// Apply remote changes to the working tree
    #[tracing::instrument(skip(self, cancel))]
    pub async fn pull(&mut self, cancel: &CancellationToken) -> Result<PullResult, SyncError> {
        let mut result = PullResult::default();

        self.progress(ProgressEvent::new(ProgressAction::Scan).with_path("listing remote objects"));

        let remote = guard(cancel, self.list_remote()).await??;
        let local = guard(
            cancel,
            walk_tree(&self.config.tree_root, &self.config.sync_paths),
        )
        .await??;

        let mut to_download: Vec<(RelPath, ObjectInfo)> = Vec::new();
        let mut to_conflict: Vec<(RelPath, ObjectInfo)> = Vec::new();
        let mut cancelled = false;

        for (path, obj) in &remote {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            match self.classify_one(path, obj, &local).await {
                Ok(PullDecision::Fetch) => to_download.push((path.clone(), obj.clone())),
                Ok(PullDecision::Conflict) => to_conflict.push((path.clone(), obj.clone())),
                Ok(PullDecision::SkipInSync | PullDecision::SkipLocalNewer) => {}
                Err(error) => {
                    warn!(path = %path, %error, "classification failed");
                    result.errors.push(FileError {
                        path: path.clone(),
                        error,
                    });
                }
            }
        }

        if !cancelled {
            for (path, obj) in &to_conflict {
                if cancel.is_cancelled() {
                    cancelled = true;
                    break;
                }
                self.progress(
                    ProgressEvent::new(ProgressAction::Conflict).with_path(path.as_str()),
                );
                match self.write_conflict_sidecar(path, obj, cancel).await {
                    Ok(()) => result.conflicts.push(path.clone()),
                    Err(SyncError::Cancelled) => {
                        cancelled = true;
                        break;
                    }
                    Err(error) => {
                        warn!(path = %path, %error, "failed to write conflict sidecar");
                        result.errors.push(FileError {
                            path: path.clone(),
                            error,
                        });
                    }
                }
            }
        }

        if !cancelled {
            let total = to_download.len();
            for (index, (path, obj)) in to_download.iter().enumerate() {
                if cancel.is_cancelled() {
                    cancelled = true;
                    break;
                }
                self.progress(
                    ProgressEvent::new(ProgressAction::Download)
                        .with_path(path.as_str())
                        .with_size(obj.size)
                        .with_progress(index + 1, total),
                );
                match self.apply_remote(path, obj, cancel).await {
                    Ok(()) => result.downloaded.push(path.clone()),
                    Err(SyncError::Cancelled) => {
                        cancelled = true;
                        break;
                    }
                    Err(error) => {
                        warn!(path = %path, %error, "download failed");
                        self.progress(
                            ProgressEvent::new(ProgressAction::Download)
                                .with_path(path.as_str())
                                .with_error(error.to_string()),
                        );
                        result.errors.push(FileError {
                            path: path.clone(),
                            error,
                        });
                    }
                }
            }
            self.progress(
                ProgressEvent::new(ProgressAction::Download)
                    .with_progress(0, total)
                    .completed(),
            );
        }

        if !cancelled {
            self.state.record_pull(Utc::now());
        }
        self.state.save(&self.config.state_path).await?;

        if cancelled {
            info!(
                downloaded = result.downloaded.len(),
                "pull cancelled; progress persisted"
            );
            return Err(SyncError::Cancelled);
        }

        info!(
            downloaded = result.downloaded.len(),
            conflicts = result.conflicts.len(),
            errors = result.errors.len(),
            "pull complete"
        );
        Ok(result)
    }

    /// List the bucket and index envelope objects by logical path
    async fn list_remote(&self) -> Result<BTreeMap<RelPath, ObjectInfo>, SyncError> {
        let objects = self.store.list("").await?;
        let mut remote = BTreeMap::new();
        for obj in objects {
            // Keys without the envelope suffix belong to someone else.
            if let Some(path) = RelPath::from_remote_key(&obj.key) {
                remote.insert(path, obj);
            }
        }
        Ok(remote)
    }

    /// Decide what to do with one remote object
    async fn classify_one(
        &self,
        path: &RelPath,
        obj: &ObjectInfo,
        local: &BTreeMap<RelPath, FileMeta>,
    ) -> Result<PullDecision, SyncError> {
        if !local.contains_key(path) {
            return Ok(classify_remote(false, false, false, false));
        }

        let Some(record) = self.state.get_file(path) else {
            return Ok(classify_remote(true, false, false, false));
        };

        let local_hash = digest::hash_file(&path.to_path(&self.config.tree_root)).await?;
        let local_clean = local_hash == record.hash;
        let remote_newer = record
            .uploaded
            .map_or(true, |uploaded| obj.last_modified > uploaded);

        Ok(classify_remote(true, true, local_clean, remote_newer))
    }

    /// Download, decrypt, and write one remote object, then update state
    async fn apply_remote(
        &mut self,
        path: &RelPath,
        obj: &ObjectInfo,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        let ciphertext = guard(cancel, self.store.download(&obj.key)).await??;
        let data = self.encryptor.decrypt(&ciphertext)?;

        let full = path.to_path(&self.config.tree_root);
        write_file_atomic(&full, &data).await?;

        self.state.update_file(
            path.clone(),
            data.len() as u64,
            Utc::now(),
            digest::hash_bytes(&data),
        );
        // The remote mtime becomes the high-water mark: changes at or
        // below it are now known.
        self.state.mark_uploaded(path, obj.last_modified);

        Ok(())
    }

    /// Materialize the remote version as a sidecar; the local file and its
    /// state record stay untouched
    async fn write_conflict_sidecar(
        &self,
        path: &RelPath,
        obj: &ObjectInfo,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        let ciphertext = guard(cancel, self.store.download(&obj.key)).await??;
        let data = self.encryptor.decrypt(&ciphertext)?;

        let sidecar_rel = RelPath::new(sidecar_name(path.as_str(), Utc::now()))?;
        let full = sidecar_rel.to_path(&self.config.tree_root);
        write_file_atomic(&full, &data).await?;

        info!(path = %path, sidecar = %sidecar_rel, "conflict sidecar written");
        Ok(())
    }

    // ========================================================================
    // Pull preview
    // ========================================================================

    /// Classify like a pull, reporting instead of writing
    #[tracing::instrument(skip(self, cancel))]
    pub async fn preview_pull(
        &self,
        cancel: &CancellationToken,
    ) -> Result<PullPreview, SyncError> {
        let remote = guard(cancel, self.list_remote()).await??;
        let local = guard(
            cancel,
            walk_tree(&self.config.tree_root, &self.config.sync_paths),
        )
        .await??;

        let mut preview = PullPreview::default();

        for (path, obj) in &remote {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            let meta = local.get(path);
            let entry = PreviewEntry {
                path: path.clone(),
                local_size: meta.map(|m| m.size),
                remote_size: obj.size,
                local_modified: meta.map(|m| m.modified),
                remote_modified: obj.last_modified,
            };

            let decision = match self.classify_one(path, obj, &local).await {
                Ok(decision) => decision,
                Err(error) => {
                    // Preview is advisory; an unreadable file just drops
                    // out of the report.
                    warn!(path = %path, %error, "preview classification failed");
                    continue;
                }
            };

            match decision {
                PullDecision::Fetch if meta.is_none() => preview.would_download.push(entry),
                PullDecision::Fetch => preview.would_overwrite.push(entry),
                PullDecision::Conflict => preview.would_conflict.push(entry),
                PullDecision::SkipLocalNewer => preview.would_keep.push(entry),
                PullDecision::SkipInSync => {}
            }
        }

        for path in local.keys() {
            if !remote.contains_key(path) {
                preview.local_only.push(path.clone());
            }
        }

        Ok(preview)
    }

    // ========================================================================
    // Key-match probe
    // ========================================================================

    /// Check whether the configured identity decrypts the bucket
    ///
    /// Transport failures while listing or downloading yield
    /// [`KeyProbe::Inconclusive`]; callers may treat that as a soft pass
    /// and let the real pull surface the failure.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn verify_key_matches_remote(
        &self,
        cancel: &CancellationToken,
    ) -> Result<KeyProbe, SyncError> {
        let objects = match guard(cancel, self.store.list("")).await? {
            Ok(objects) => objects,
            Err(error) => {
                warn!(%error, "probe could not list the bucket");
                return Ok(KeyProbe::Inconclusive);
            }
        };

        if objects.is_empty() {
            return Ok(KeyProbe::Match);
        }

        let Some(candidate) = select_probe_object(&objects) else {
            return Ok(KeyProbe::Match);
        };

        let ciphertext = match guard(cancel, self.store.download(&candidate.key)).await? {
            Ok(ciphertext) => ciphertext,
            Err(error) => {
                warn!(key = %candidate.key, %error, "probe download failed");
                return Ok(KeyProbe::Inconclusive);
            }
        };

        match self.encryptor.decrypt(&ciphertext) {
            Ok(_) => Ok(KeyProbe::Match),
            Err(_) => Ok(KeyProbe::Mismatch),
        }
    }

    // ========================================================================
    // Diff
    // ========================================================================

    /// Three-way listing of local tree, state, and bucket
    #[tracing::instrument(skip(self, cancel))]
    pub async fn diff(&self, cancel: &CancellationToken) -> Result<Vec<DiffEntry>, SyncError> {
        let remote = guard(cancel, self.list_remote()).await??;
        let local = guard(
            cancel,
            walk_tree(&self.config.tree_root, &self.config.sync_paths),
        )
        .await??;

        let mut entries = Vec::new();

        for (path, meta) in &local {
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            let Some(obj) = remote.get(path) else {
                entries.push(DiffEntry {
                    path: path.clone(),
                    status: DiffStatus::LocalOnly,
                    local_size: Some(meta.size),
                    remote_size: None,
                    local_modified: Some(meta.modified),
                    remote_modified: None,
                });
                continue;
            };

            let status = match self.state.get_file(path) {
                None => DiffStatus::Modified,
                Some(record) => {
                    let in_sync = match digest::hash_file(&path.to_path(&self.config.tree_root))
                        .await
                    {
                        Ok(hash) => {
                            let remote_newer = record
                                .uploaded
                                .map_or(true, |uploaded| obj.last_modified > uploaded);
                            hash == record.hash && !remote_newer
                        }
                        Err(_) => false,
                    };
                    if in_sync {
                        DiffStatus::InSync
                    } else {
                        DiffStatus::Modified
                    }
                }
            };

            entries.push(DiffEntry {
                path: path.clone(),
                status,
                local_size: Some(meta.size),
                remote_size: Some(obj.size),
                local_modified: Some(meta.modified),
                remote_modified: Some(obj.last_modified),
            });
        }

        for (path, obj) in &remote {
            if !local.contains_key(path) {
                entries.push(DiffEntry {
                    path: path.clone(),
                    status: DiffStatus::RemoteOnly,
                    local_size: None,
                    remote_size: Some(obj.size),
                    local_modified: None,
                    remote_modified: Some(obj.last_modified),
                });
            }
        }

        Ok(entries)
    }

    // ========================================================================
    // Remote wipe and backup
    // ========================================================================

    /// Delete every object in the bucket; local state is untouched
    ///
    /// Used by the key-mismatch recovery flow ("clear remote and start
    /// over") and reset tooling.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn clear_remote(&self, cancel: &CancellationToken) -> Result<usize, SyncError> {
        let objects = guard(cancel, self.store.list("")).await??;
        if objects.is_empty() {
            return Ok(0);
        }

        let keys: Vec<String> = objects.into_iter().map(|obj| obj.key).collect();
        guard(cancel, self.store.delete_batch(&keys)).await??;

        info!(deleted = keys.len(), "remote storage cleared");
        Ok(keys.len())
    }

    /// Snapshot the working-tree subset next to the tree root
    pub async fn create_backup(&self) -> Result<PathBuf, SyncError> {
        backup::create_backup(&self.config.tree_root, &self.config.sync_paths).await
    }
}

/// Write via a sibling temporary and rename, creating parent directories
async fn write_file_atomic(path: &std::path::Path, data: &[u8]) -> Result<(), SyncError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp_path = {
        let mut p = path.as_os_str().to_owned();
        p.push(".tmp");
        PathBuf::from(p)
    };

    tokio::fs::write(&tmp_path, data).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
