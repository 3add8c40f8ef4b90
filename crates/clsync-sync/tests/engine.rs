//! Engine-level tests against an in-memory bucket
//!
//! Each test wires one or two `SyncEngine`s (sharing a bucket and, where
//! cross-device behavior matters, an identity) over temp-dir working trees.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use tokio_util::sync::CancellationToken;

use clsync_core::config::EngineConfig;
use clsync_core::domain::RelPath;
use clsync_core::memory::MemoryBlobStore;
use clsync_core::ports::{BlobStore, StoreError};
use clsync_crypto::{generate_identity, write_key_file, Encryptor, X25519Identity};
use clsync_sync::{DiffStatus, KeyProbe, SyncEngine, SyncError, SyncState};

const HELLO_SHA256: &str = "185f8db32271fe25f561a6fc938b2e264306ec304eda518007d1764826381969";

fn rel(s: &str) -> RelPath {
    RelPath::new(s).unwrap()
}

async fn write(path: &Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.unwrap();
    }
    tokio::fs::write(path, contents).await.unwrap();
}

/// Per-device layout: a working tree plus a config dir holding the key
/// and state files.
fn device_config(base: &Path, name: &str, sync_paths: &[&str]) -> EngineConfig {
    let tree_root = base.join(name).join("tree");
    let config_dir = base.join(name).join("config");
    std::fs::create_dir_all(&tree_root).unwrap();
    EngineConfig::new(
        tree_root,
        sync_paths.iter().map(ToString::to_string).collect(),
        config_dir.join("age-key.txt"),
        config_dir.join("state.json"),
    )
}

async fn engine_with_key(
    config: &EngineConfig,
    store: Arc<dyn BlobStore>,
    identity: &X25519Identity,
) -> SyncEngine {
    write_key_file(&config.key_path, identity).unwrap();
    SyncEngine::new(config.clone(), store).await.unwrap()
}

fn encrypt_fixture(identity: &X25519Identity, plaintext: &[u8]) -> Vec<u8> {
    Encryptor::from_identity(identity.clone())
        .encrypt(plaintext)
        .unwrap()
}

fn decrypt_fixture(identity: &X25519Identity, ciphertext: &[u8]) -> Vec<u8> {
    Encryptor::from_identity(identity.clone())
        .decrypt(ciphertext)
        .unwrap()
}

/// Find the sidecar written for `original` inside `dir`, if any.
fn find_sidecar(dir: &Path, original: &str) -> Option<PathBuf> {
    let marker = format!("{original}.conflict.");
    std::fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .find(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&marker))
        })
}

// ============================================================================
// Push
// ============================================================================

#[tokio::test]
async fn fresh_push_uploads_and_records_state() {
    let dir = tempfile::tempdir().unwrap();
    let identity = generate_identity();
    let store = Arc::new(MemoryBlobStore::new());
    let config = device_config(dir.path(), "a", &["CLAUDE.md"]);
    let mut engine = engine_with_key(&config, store.clone(), &identity).await;

    write(&config.tree_root.join("CLAUDE.md"), b"Hello").await;

    let result = engine.push(&CancellationToken::new()).await.unwrap();
    assert_eq!(result.uploaded, vec![rel("CLAUDE.md")]);
    assert!(result.deleted.is_empty());
    assert!(result.errors.is_empty());

    // Exactly one remote object, under the envelope key.
    assert_eq!(store.len().await, 1);
    let ciphertext = store.download("CLAUDE.md.age").await.unwrap();
    assert_eq!(decrypt_fixture(&identity, &ciphertext), b"Hello");
    // The bucket never sees plaintext.
    assert_ne!(ciphertext, b"Hello");

    let record = engine.state().get_file(&rel("CLAUDE.md")).unwrap();
    assert_eq!(record.hash.as_str(), HELLO_SHA256);
    assert_eq!(record.size, 5);
    assert!(record.uploaded.is_some());
    assert!(engine.state().last_push().is_some());
    assert!(engine.state().last_sync().is_some());
}

#[tokio::test]
async fn second_push_reports_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let identity = generate_identity();
    let store = Arc::new(MemoryBlobStore::new());
    let config = device_config(dir.path(), "a", &["settings.json"]);
    let mut engine = engine_with_key(&config, store.clone(), &identity).await;

    write(&config.tree_root.join("settings.json"), b"{}").await;

    let first = engine.push(&CancellationToken::new()).await.unwrap();
    assert_eq!(first.uploaded.len(), 1);

    let second = engine.push(&CancellationToken::new()).await.unwrap();
    assert!(second.is_empty());
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn push_propagates_local_delete() {
    let dir = tempfile::tempdir().unwrap();
    let identity = generate_identity();
    let store = Arc::new(MemoryBlobStore::new());
    let config = device_config(dir.path(), "a", &["agents"]);
    let mut engine = engine_with_key(&config, store.clone(), &identity).await;

    let file = config.tree_root.join("agents/x.json");
    write(&file, b"{}").await;
    engine.push(&CancellationToken::new()).await.unwrap();
    assert!(store.contains_key("agents/x.json.age").await);

    tokio::fs::remove_file(&file).await.unwrap();
    let result = engine.push(&CancellationToken::new()).await.unwrap();

    assert_eq!(result.deleted, vec![rel("agents/x.json")]);
    assert!(!store.contains_key("agents/x.json.age").await);
    assert!(engine.state().get_file(&rel("agents/x.json")).is_none());
}

/// Fails every upload of one specific key; everything else delegates.
struct FailingUploadStore {
    inner: MemoryBlobStore,
    fail_key: String,
}

#[async_trait::async_trait]
impl BlobStore for FailingUploadStore {
    async fn upload(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        if key == self.fail_key {
            return Err(StoreError::Network("injected upload failure".to_string()));
        }
        self.inner.upload(key, data).await
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.inner.download(key).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.inner.delete(key).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<clsync_core::ports::ObjectInfo>, StoreError> {
        self.inner.list(prefix).await
    }

    async fn head(&self, key: &str) -> Result<clsync_core::ports::ObjectInfo, StoreError> {
        self.inner.head(key).await
    }

    async fn bucket_exists(&self) -> Result<bool, StoreError> {
        self.inner.bucket_exists().await
    }
}

#[tokio::test]
async fn push_continues_after_per_file_failure() {
    let dir = tempfile::tempdir().unwrap();
    let identity = generate_identity();
    let store = Arc::new(FailingUploadStore {
        inner: MemoryBlobStore::new(),
        fail_key: "agents/bad.json.age".to_string(),
    });
    let config = device_config(dir.path(), "a", &["agents"]);
    let mut engine = engine_with_key(&config, store.clone(), &identity).await;

    write(&config.tree_root.join("agents/bad.json"), b"fails").await;
    write(&config.tree_root.join("agents/good.json"), b"works").await;

    let result = engine.push(&CancellationToken::new()).await.unwrap();

    assert_eq!(result.uploaded, vec![rel("agents/good.json")]);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].path, rel("agents/bad.json"));
    assert!(matches!(result.errors[0].error, SyncError::Network(_)));

    // Only the successful path entered the state, so a retry re-attempts
    // the failed one.
    assert!(engine.state().get_file(&rel("agents/good.json")).is_some());
    assert!(engine.state().get_file(&rel("agents/bad.json")).is_none());
}

// ============================================================================
// Pull
// ============================================================================

#[tokio::test]
async fn cross_device_pull() {
    let dir = tempfile::tempdir().unwrap();
    let identity = generate_identity();
    let store = Arc::new(MemoryBlobStore::new());

    let config_a = device_config(dir.path(), "a", &["settings.json"]);
    let mut device_a = engine_with_key(&config_a, store.clone(), &identity).await;
    write(&config_a.tree_root.join("settings.json"), b"{\"theme\":\"dark\"}").await;
    device_a.push(&CancellationToken::new()).await.unwrap();

    let config_b = device_config(dir.path(), "b", &["settings.json"]);
    let mut device_b = engine_with_key(&config_b, store.clone(), &identity).await;
    let result = device_b.pull(&CancellationToken::new()).await.unwrap();

    assert_eq!(result.downloaded, vec![rel("settings.json")]);
    assert!(result.conflicts.is_empty());
    assert!(result.errors.is_empty());

    let contents = tokio::fs::read(config_b.tree_root.join("settings.json"))
        .await
        .unwrap();
    assert_eq!(contents, b"{\"theme\":\"dark\"}");

    let record = device_b.state().get_file(&rel("settings.json")).unwrap();
    assert_eq!(
        record.hash,
        clsync_sync::digest::hash_bytes(b"{\"theme\":\"dark\"}")
    );
    // The remote mtime becomes the high-water mark.
    let remote = store.head("settings.json.age").await.unwrap();
    assert_eq!(record.uploaded, Some(remote.last_modified));
    assert!(device_b.state().last_pull().is_some());
}

#[tokio::test]
async fn second_pull_reports_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let identity = generate_identity();
    let store = Arc::new(MemoryBlobStore::new());

    let config_a = device_config(dir.path(), "a", &["settings.json"]);
    let mut device_a = engine_with_key(&config_a, store.clone(), &identity).await;
    write(&config_a.tree_root.join("settings.json"), b"{}").await;
    device_a.push(&CancellationToken::new()).await.unwrap();

    let config_b = device_config(dir.path(), "b", &["settings.json"]);
    let mut device_b = engine_with_key(&config_b, store.clone(), &identity).await;
    device_b.pull(&CancellationToken::new()).await.unwrap();

    let second = device_b.pull(&CancellationToken::new()).await.unwrap();
    assert!(second.is_empty());
}

#[tokio::test]
async fn conflict_preserves_local_and_writes_sidecar() {
    let dir = tempfile::tempdir().unwrap();
    let identity = generate_identity();
    let store = Arc::new(MemoryBlobStore::new());

    // Both devices start in sync on notes.txt = "v1".
    let config_a = device_config(dir.path(), "a", &["notes.txt"]);
    let mut device_a = engine_with_key(&config_a, store.clone(), &identity).await;
    write(&config_a.tree_root.join("notes.txt"), b"v1").await;
    device_a.push(&CancellationToken::new()).await.unwrap();

    let config_b = device_config(dir.path(), "b", &["notes.txt"]);
    let mut device_b = engine_with_key(&config_b, store.clone(), &identity).await;
    device_b.pull(&CancellationToken::new()).await.unwrap();

    // A edits and pushes; B edits locally without pushing.
    write(&config_a.tree_root.join("notes.txt"), b"v1a").await;
    device_a.push(&CancellationToken::new()).await.unwrap();
    write(&config_b.tree_root.join("notes.txt"), b"v1b").await;

    let pre_pull_record = device_b.state().get_file(&rel("notes.txt")).unwrap().clone();
    let result = device_b.pull(&CancellationToken::new()).await.unwrap();

    assert_eq!(result.conflicts, vec![rel("notes.txt")]);
    assert!(result.downloaded.is_empty());
    assert!(result.errors.is_empty());

    // Local content untouched.
    let local = tokio::fs::read(config_b.tree_root.join("notes.txt"))
        .await
        .unwrap();
    assert_eq!(local, b"v1b");

    // The sidecar carries the remote version.
    let sidecar = find_sidecar(&config_b.tree_root, "notes.txt").unwrap();
    let sidecar_contents = tokio::fs::read(&sidecar).await.unwrap();
    assert_eq!(sidecar_contents, b"v1a");

    // The state record was not touched: the local side is still dirty
    // relative to the last accepted version.
    let post_pull_record = device_b.state().get_file(&rel("notes.txt")).unwrap();
    assert_eq!(post_pull_record, &pre_pull_record);
}

#[tokio::test]
async fn pull_does_not_propagate_remote_deletes() {
    let dir = tempfile::tempdir().unwrap();
    let identity = generate_identity();
    let store = Arc::new(MemoryBlobStore::new());

    let config_a = device_config(dir.path(), "a", &["agents"]);
    let mut device_a = engine_with_key(&config_a, store.clone(), &identity).await;
    write(&config_a.tree_root.join("agents/x.json"), b"{}").await;
    device_a.push(&CancellationToken::new()).await.unwrap();

    let config_b = device_config(dir.path(), "b", &["agents"]);
    let mut device_b = engine_with_key(&config_b, store.clone(), &identity).await;
    device_b.pull(&CancellationToken::new()).await.unwrap();

    // A deletes and pushes; the remote object disappears.
    tokio::fs::remove_file(config_a.tree_root.join("agents/x.json"))
        .await
        .unwrap();
    device_a.push(&CancellationToken::new()).await.unwrap();
    assert!(!store.contains_key("agents/x.json.age").await);

    // B's pull sees nothing for the path; the local file and its record
    // survive. Deletes only propagate through push on the deleting device.
    let result = device_b.pull(&CancellationToken::new()).await.unwrap();
    assert!(result.is_empty());
    assert!(config_b.tree_root.join("agents/x.json").exists());
    assert!(device_b.state().get_file(&rel("agents/x.json")).is_some());
}

#[tokio::test]
async fn pull_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let identity = generate_identity();
    let store = Arc::new(MemoryBlobStore::new());

    store
        .insert_object(
            "skills/review/SKILL.md.age",
            encrypt_fixture(&identity, b"# review"),
            Utc::now(),
        )
        .await;

    let config = device_config(dir.path(), "b", &["skills"]);
    let mut engine = engine_with_key(&config, store.clone(), &identity).await;
    let result = engine.pull(&CancellationToken::new()).await.unwrap();

    assert_eq!(result.downloaded, vec![rel("skills/review/SKILL.md")]);
    let contents = tokio::fs::read(config.tree_root.join("skills/review/SKILL.md"))
        .await
        .unwrap();
    assert_eq!(contents, b"# review");
}

#[tokio::test]
async fn pull_decrypt_failure_is_per_file() {
    let dir = tempfile::tempdir().unwrap();
    let identity = generate_identity();
    let store = Arc::new(MemoryBlobStore::new());

    store
        .insert_object(
            "good.txt.age",
            encrypt_fixture(&identity, b"fine"),
            Utc::now(),
        )
        .await;
    store
        .insert_object("bad.txt.age", b"not an age envelope".to_vec(), Utc::now())
        .await;

    let config = device_config(dir.path(), "b", &["good.txt", "bad.txt"]);
    let mut engine = engine_with_key(&config, store.clone(), &identity).await;
    let result = engine.pull(&CancellationToken::new()).await.unwrap();

    assert_eq!(result.downloaded, vec![rel("good.txt")]);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].path, rel("bad.txt"));
    assert!(matches!(result.errors[0].error, SyncError::KeyDecrypt(_)));
    assert!(!config.tree_root.join("bad.txt").exists());
}

#[tokio::test]
async fn pull_ignores_foreign_keys() {
    let dir = tempfile::tempdir().unwrap();
    let identity = generate_identity();
    let store = Arc::new(MemoryBlobStore::new());

    store
        .insert_object("manifest.sha256", b"not ours".to_vec(), Utc::now())
        .await;

    let config = device_config(dir.path(), "b", &["manifest.sha256"]);
    let mut engine = engine_with_key(&config, store.clone(), &identity).await;
    let result = engine.pull(&CancellationToken::new()).await.unwrap();

    assert!(result.is_empty());
    assert!(!config.tree_root.join("manifest.sha256").exists());
}

#[tokio::test]
async fn untracked_local_file_conflicts_on_pull() {
    let dir = tempfile::tempdir().unwrap();
    let identity = generate_identity();
    let store = Arc::new(MemoryBlobStore::new());

    store
        .insert_object(
            "settings.json.age",
            encrypt_fixture(&identity, b"remote"),
            Utc::now(),
        )
        .await;

    let config = device_config(dir.path(), "b", &["settings.json"]);
    let mut engine = engine_with_key(&config, store.clone(), &identity).await;
    write(&config.tree_root.join("settings.json"), b"local").await;

    let result = engine.pull(&CancellationToken::new()).await.unwrap();

    // Present but untracked: the engine cannot claim either side wins.
    assert_eq!(result.conflicts, vec![rel("settings.json")]);
    let local = tokio::fs::read(config.tree_root.join("settings.json"))
        .await
        .unwrap();
    assert_eq!(local, b"local");
    let sidecar = find_sidecar(&config.tree_root, "settings.json").unwrap();
    assert_eq!(tokio::fs::read(&sidecar).await.unwrap(), b"remote");
}

// ============================================================================
// Backup
// ============================================================================

#[tokio::test]
async fn backup_then_pull_preserves_pre_pull_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let identity = generate_identity();
    let store = Arc::new(MemoryBlobStore::new());

    store
        .insert_object(
            "settings.json.age",
            encrypt_fixture(&identity, b"remote"),
            Utc::now(),
        )
        .await;

    let config = device_config(dir.path(), "b", &["settings.json"]);
    let mut engine = engine_with_key(&config, store.clone(), &identity).await;
    write(&config.tree_root.join("settings.json"), b"local").await;

    let backup_root = engine.create_backup().await.unwrap();
    engine.pull(&CancellationToken::new()).await.unwrap();

    let name = backup_root.file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with("tree.backup."));
    let backed_up = tokio::fs::read(backup_root.join("settings.json"))
        .await
        .unwrap();
    assert_eq!(backed_up, b"local");
}

// ============================================================================
// Preview
// ============================================================================

#[tokio::test]
async fn preview_classifies_all_buckets() {
    let dir = tempfile::tempdir().unwrap();
    let identity = generate_identity();
    let store = Arc::new(MemoryBlobStore::new());
    let config = device_config(
        dir.path(),
        "a",
        &["overwrite.txt", "conflict.txt", "keep.txt", "new.txt", "only-local.txt"],
    );
    let mut engine = engine_with_key(&config, store.clone(), &identity).await;

    write(&config.tree_root.join("overwrite.txt"), b"o-v1").await;
    write(&config.tree_root.join("conflict.txt"), b"c-v1").await;
    write(&config.tree_root.join("keep.txt"), b"k-v1").await;
    engine.push(&CancellationToken::new()).await.unwrap();

    // Local edits after the push make conflict.txt and keep.txt dirty.
    write(&config.tree_root.join("conflict.txt"), b"c-v2-local").await;
    write(&config.tree_root.join("keep.txt"), b"k-v2-local").await;
    // Never-pushed local file.
    write(&config.tree_root.join("only-local.txt"), b"mine").await;

    // Newer remote versions for overwrite.txt and conflict.txt; a brand
    // new remote object for new.txt. keep.txt's remote stays as pushed.
    let newer = Utc::now() + Duration::seconds(5);
    store
        .insert_object(
            "overwrite.txt.age",
            encrypt_fixture(&identity, b"o-v2-remote"),
            newer,
        )
        .await;
    store
        .insert_object(
            "conflict.txt.age",
            encrypt_fixture(&identity, b"c-v2-remote"),
            newer,
        )
        .await;
    store
        .insert_object("new.txt.age", encrypt_fixture(&identity, b"fresh"), newer)
        .await;

    let preview = engine.preview_pull(&CancellationToken::new()).await.unwrap();

    let paths = |entries: &[clsync_sync::PreviewEntry]| -> Vec<String> {
        entries.iter().map(|e| e.path.to_string()).collect()
    };
    assert_eq!(paths(&preview.would_download), vec!["new.txt"]);
    assert_eq!(paths(&preview.would_overwrite), vec!["overwrite.txt"]);
    assert_eq!(paths(&preview.would_conflict), vec!["conflict.txt"]);
    assert_eq!(paths(&preview.would_keep), vec!["keep.txt"]);
    assert_eq!(preview.local_only, vec![rel("only-local.txt")]);

    let overwrite = &preview.would_overwrite[0];
    assert_eq!(overwrite.local_size, Some(4));
    assert!(overwrite.local_modified.is_some());
    assert_eq!(overwrite.remote_modified, newer);
}

#[tokio::test]
async fn preview_performs_no_writes() {
    let dir = tempfile::tempdir().unwrap();
    let identity = generate_identity();
    let store = Arc::new(MemoryBlobStore::new());

    store
        .insert_object(
            "settings.json.age",
            encrypt_fixture(&identity, b"remote"),
            Utc::now(),
        )
        .await;

    let config = device_config(dir.path(), "b", &["settings.json"]);
    let engine = engine_with_key(&config, store.clone(), &identity).await;

    let preview = engine.preview_pull(&CancellationToken::new()).await.unwrap();
    assert_eq!(preview.would_download.len(), 1);

    // No file written, no state persisted.
    assert!(!config.tree_root.join("settings.json").exists());
    assert!(!config.state_path.exists());
    assert!(!engine.state().has_state());
}

// ============================================================================
// Key-match probe
// ============================================================================

#[tokio::test]
async fn probe_empty_bucket_matches() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryBlobStore::new());
    let config = device_config(dir.path(), "a", &["CLAUDE.md"]);
    let engine = engine_with_key(&config, store, &generate_identity()).await;

    let outcome = engine
        .verify_key_matches_remote(&CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome, KeyProbe::Match);
}

#[tokio::test]
async fn probe_detects_matching_key() {
    let dir = tempfile::tempdir().unwrap();
    let identity = generate_identity();
    let store = Arc::new(MemoryBlobStore::new());
    store
        .insert_object(
            "settings.json.age",
            encrypt_fixture(&identity, b"payload"),
            Utc::now(),
        )
        .await;

    let config = device_config(dir.path(), "a", &["settings.json"]);
    let engine = engine_with_key(&config, store, &identity).await;

    let outcome = engine
        .verify_key_matches_remote(&CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome, KeyProbe::Match);
}

#[tokio::test]
async fn probe_detects_key_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let writer_identity = generate_identity();
    let store = Arc::new(MemoryBlobStore::new());
    store
        .insert_object(
            "settings.json.age",
            encrypt_fixture(&writer_identity, b"payload"),
            Utc::now(),
        )
        .await;

    // The engine runs under a different identity than the bucket's writer.
    let config = device_config(dir.path(), "b", &["settings.json"]);
    let engine = engine_with_key(&config, store, &generate_identity()).await;

    let outcome = engine
        .verify_key_matches_remote(&CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome, KeyProbe::Mismatch);
}

// ============================================================================
// Cancellation
// ============================================================================

/// Cancels the token right after one specific key uploads.
struct CancellingStore {
    inner: MemoryBlobStore,
    cancel_after: String,
    token: CancellationToken,
}

#[async_trait::async_trait]
impl BlobStore for CancellingStore {
    async fn upload(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        self.inner.upload(key, data).await?;
        if key == self.cancel_after {
            self.token.cancel();
        }
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.inner.download(key).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.inner.delete(key).await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<clsync_core::ports::ObjectInfo>, StoreError> {
        self.inner.list(prefix).await
    }

    async fn head(&self, key: &str) -> Result<clsync_core::ports::ObjectInfo, StoreError> {
        self.inner.head(key).await
    }

    async fn bucket_exists(&self) -> Result<bool, StoreError> {
        self.inner.bucket_exists().await
    }
}

#[tokio::test]
async fn cancelled_push_persists_partial_progress() {
    let dir = tempfile::tempdir().unwrap();
    let identity = generate_identity();
    let token = CancellationToken::new();
    let store = Arc::new(CancellingStore {
        inner: MemoryBlobStore::new(),
        cancel_after: "a.txt.age".to_string(),
        token: token.clone(),
    });
    let config = device_config(dir.path(), "a", &["a.txt", "b.txt"]);
    let mut engine = engine_with_key(&config, store.clone(), &identity).await;

    write(&config.tree_root.join("a.txt"), b"first").await;
    write(&config.tree_root.join("b.txt"), b"second").await;

    // Walk order is deterministic: a.txt uploads, then the token fires
    // before b.txt is attempted.
    let outcome = engine.push(&token).await;
    assert!(matches!(outcome, Err(SyncError::Cancelled)));

    // The state on disk reflects the completed upload, so a re-run
    // resumes with only b.txt left.
    let state = SyncState::load(&config.state_path).await.unwrap();
    assert!(state.get_file(&rel("a.txt")).is_some());
    assert!(state.get_file(&rel("b.txt")).is_none());
    assert!(state.last_push().is_none());
}

// ============================================================================
// Remote wipe, diff, invisibility
// ============================================================================

#[tokio::test]
async fn clear_remote_deletes_everything() {
    let dir = tempfile::tempdir().unwrap();
    let identity = generate_identity();
    let store = Arc::new(MemoryBlobStore::new());
    let config = device_config(dir.path(), "a", &["agents"]);
    let mut engine = engine_with_key(&config, store.clone(), &identity).await;

    write(&config.tree_root.join("agents/x.json"), b"{}").await;
    write(&config.tree_root.join("agents/y.json"), b"{}").await;
    engine.push(&CancellationToken::new()).await.unwrap();
    assert_eq!(store.len().await, 2);

    let deleted = engine.clear_remote(&CancellationToken::new()).await.unwrap();
    assert_eq!(deleted, 2);
    assert!(store.is_empty().await);
    // Local state stays as it was; only the bucket is wiped.
    assert_eq!(engine.state().files().len(), 2);
}

#[tokio::test]
async fn diff_classifies_paths() {
    let dir = tempfile::tempdir().unwrap();
    let identity = generate_identity();
    let store = Arc::new(MemoryBlobStore::new());
    let config = device_config(
        dir.path(),
        "a",
        &["synced.txt", "edited.txt", "local.txt", "remote.txt"],
    );
    let mut engine = engine_with_key(&config, store.clone(), &identity).await;

    write(&config.tree_root.join("synced.txt"), b"same").await;
    write(&config.tree_root.join("edited.txt"), b"v1").await;
    engine.push(&CancellationToken::new()).await.unwrap();

    write(&config.tree_root.join("edited.txt"), b"v2").await;
    write(&config.tree_root.join("local.txt"), b"never pushed").await;
    store
        .insert_object(
            "remote.txt.age",
            encrypt_fixture(&identity, b"only remote"),
            Utc::now(),
        )
        .await;

    let entries = engine.diff(&CancellationToken::new()).await.unwrap();
    let status_of = |path: &str| -> DiffStatus {
        entries
            .iter()
            .find(|e| e.path.as_str() == path)
            .unwrap()
            .status
    };

    assert_eq!(status_of("synced.txt"), DiffStatus::InSync);
    assert_eq!(status_of("edited.txt"), DiffStatus::Modified);
    assert_eq!(status_of("local.txt"), DiffStatus::LocalOnly);
    assert_eq!(status_of("remote.txt"), DiffStatus::RemoteOnly);
}

#[tokio::test]
async fn symlinks_never_synced() {
    let dir = tempfile::tempdir().unwrap();
    let identity = generate_identity();
    let store = Arc::new(MemoryBlobStore::new());
    let config = device_config(dir.path(), "a", &["agents"]);
    let mut engine = engine_with_key(&config, store.clone(), &identity).await;

    write(&config.tree_root.join("agents/real.json"), b"{}").await;
    tokio::fs::symlink(
        config.tree_root.join("agents/real.json"),
        config.tree_root.join("agents/link.json"),
    )
    .await
    .unwrap();

    engine.push(&CancellationToken::new()).await.unwrap();

    assert!(store.contains_key("agents/real.json.age").await);
    assert!(!store.contains_key("agents/link.json.age").await);
    assert!(engine.state().get_file(&rel("agents/link.json")).is_none());
}

#[tokio::test]
async fn sidecars_never_pushed() {
    let dir = tempfile::tempdir().unwrap();
    let identity = generate_identity();
    let store = Arc::new(MemoryBlobStore::new());
    let config = device_config(dir.path(), "a", &["notes.txt", "agents"]);
    let mut engine = engine_with_key(&config, store.clone(), &identity).await;

    write(&config.tree_root.join("notes.txt"), b"local").await;
    write(
        &config.tree_root.join("notes.txt.conflict.20260314-092653"),
        b"old remote",
    )
    .await;
    write(
        &config.tree_root.join("agents/x.json.conflict.20260101-000000"),
        b"old remote",
    )
    .await;

    let result = engine.push(&CancellationToken::new()).await.unwrap();

    assert_eq!(result.uploaded, vec![rel("notes.txt")]);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn progress_events_emitted_at_change_boundaries() {
    let dir = tempfile::tempdir().unwrap();
    let identity = generate_identity();
    let store = Arc::new(MemoryBlobStore::new());
    let config = device_config(dir.path(), "a", &["CLAUDE.md"]);
    let mut engine = engine_with_key(&config, store.clone(), &identity).await;

    write(&config.tree_root.join("CLAUDE.md"), b"Hello").await;

    let actions: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = actions.clone();
    engine.set_progress_fn(Box::new(move |event| {
        sink.lock().unwrap().push(event.action.to_string());
    }));

    engine.push(&CancellationToken::new()).await.unwrap();

    let seen = actions.lock().unwrap();
    assert!(seen.contains(&"scan".to_string()));
    assert!(seen.contains(&"upload".to_string()));
}
