//! Blob store port (driven/secondary port)
//!
//! The engine's only view of the remote bucket: an opaque key→bytes store.
//! Concrete adapters (R2, S3, GCS, ...) live outside this workspace and
//! implement this trait; [`crate::memory::MemoryBlobStore`] is the
//! in-process implementation used by tests.
//!
//! ## Design Notes
//!
//! - Errors carry their transport classification (`StoreError`) because the
//!   engine must map them onto the caller-visible error kinds. No
//!   adapter-specific detail beyond the classification leaks upward.
//! - All operations are cancellable by dropping the returned future; the
//!   engine races every call against its cancellation token.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Metadata about a stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Bucket key
    pub key: String,
    /// Object size in bytes
    pub size: u64,
    /// Last-modified instant reported by the store
    pub last_modified: DateTime<Utc>,
    /// Opaque entity tag
    pub etag: String,
}

/// Errors surfaced by blob store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transient or permanent transport failure
    #[error("network error: {0}")]
    Network(String),

    /// The store rejected the configured credentials
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// The configured bucket does not exist
    #[error("bucket not found: {0}")]
    BucketMissing(String),

    /// The requested key does not exist
    #[error("no such key: {0}")]
    KeyMissing(String),

    /// One or more keys in a batch delete failed
    #[error("batch delete failed for {} key(s)", failures.len())]
    Batch {
        /// (key, error message) for each failed delete
        failures: Vec<(String, String)>,
    },

    /// Anything the adapter could not classify
    #[error("storage error: {0}")]
    Other(String),
}

/// Port trait for the remote object store
///
/// ## Implementation Notes
///
/// - `delete` is idempotent: deleting an absent key succeeds.
/// - `list` returns every object under the prefix; pagination is the
///   adapter's concern and result order is unspecified.
/// - `bucket_exists` reserves errors for "could not determine"; a missing
///   bucket is `Ok(false)`, never an error.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `key`, replacing any existing object
    async fn upload(&self, key: &str, data: &[u8]) -> Result<(), StoreError>;

    /// Retrieve the object stored under `key`
    async fn download(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Remove the object stored under `key`; absent keys are a success
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Remove several objects
    ///
    /// The default implementation deletes sequentially and aggregates
    /// failures into [`StoreError::Batch`]. Adapters may override with
    /// parallel fan-out, keeping concurrency bounded (10 or fewer in
    /// flight) and the same aggregate error shape.
    async fn delete_batch(&self, keys: &[String]) -> Result<(), StoreError> {
        let mut failures = Vec::new();
        for key in keys {
            if let Err(err) = self.delete(key).await {
                failures.push((key.clone(), err.to_string()));
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(StoreError::Batch { failures })
        }
    }

    /// List objects whose key starts with `prefix` (empty prefix: all)
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StoreError>;

    /// Retrieve metadata for `key` without downloading content
    async fn head(&self, key: &str) -> Result<ObjectInfo, StoreError>;

    /// Whether the configured bucket exists
    async fn bucket_exists(&self) -> Result<bool, StoreError>;
}
