//! In-memory blob store
//!
//! A [`BlobStore`] over a process-local map. The engine test-suite uses it
//! as its bucket; embedders can use it to dry-run flows without network
//! access. Objects uploaded through the port get a `last_modified` of now
//! and a fresh etag; fixtures can inject objects with explicit timestamps
//! via [`MemoryBlobStore::insert_object`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::ports::blob_store::{BlobStore, ObjectInfo, StoreError};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    last_modified: DateTime<Utc>,
    etag: String,
}

/// Process-local [`BlobStore`] implementation
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, StoredObject>>,
    etag_counter: AtomicU64,
}

impl MemoryBlobStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_etag(&self) -> String {
        let n = self.etag_counter.fetch_add(1, Ordering::Relaxed);
        format!("{n:016x}")
    }

    /// Insert an object with an explicit `last_modified` instant
    pub async fn insert_object(&self, key: &str, data: Vec<u8>, last_modified: DateTime<Utc>) {
        let etag = self.next_etag();
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                data,
                last_modified,
                etag,
            },
        );
    }

    /// Number of stored objects
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Whether the store holds no objects
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// Whether an object exists under `key`
    pub async fn contains_key(&self, key: &str) -> bool {
        self.objects.read().await.contains_key(key)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        let etag = self.next_etag();
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                data: data.to_vec(),
                last_modified: Utc::now(),
                etag,
            },
        );
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|obj| obj.data.clone())
            .ok_or_else(|| StoreError::KeyMissing(key.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StoreError> {
        let objects = self.objects.read().await;
        let mut infos: Vec<ObjectInfo> = objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, obj)| ObjectInfo {
                key: key.clone(),
                size: obj.data.len() as u64,
                last_modified: obj.last_modified,
                etag: obj.etag.clone(),
            })
            .collect();
        infos.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(infos)
    }

    async fn head(&self, key: &str) -> Result<ObjectInfo, StoreError> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|obj| ObjectInfo {
                key: key.to_string(),
                size: obj.data.len() as u64,
                last_modified: obj.last_modified,
                etag: obj.etag.clone(),
            })
            .ok_or_else(|| StoreError::KeyMissing(key.to_string()))
    }

    async fn bucket_exists(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}
