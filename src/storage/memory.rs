//! In-process object store for local development and tests

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::Result;
use crate::storage::traits::{compose_public_url, ObjectMeta, ObjectStore};

#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub data: Vec<u8>,
    pub content_type: String,
    pub last_modified: DateTime<Utc>,
}

/// Keeps objects in a sorted map. Listing follows S3 semantics: lexicographic
/// key order, truncated at `max_keys`.
pub struct MemoryStore {
    public_base_url: String,
    objects: RwLock<BTreeMap<String, StoredBlob>>,
    list_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new(public_base_url: impl Into<String>) -> Self {
        Self {
            public_base_url: public_base_url.into(),
            objects: RwLock::new(BTreeMap::new()),
            list_calls: AtomicUsize::new(0),
        }
    }

    /// Insert an object with an explicit modification time
    pub fn insert_at(&self, key: &str, data: Vec<u8>, last_modified: DateTime<Utc>) {
        self.objects.write().insert(
            key.to_string(),
            StoredBlob {
                data,
                content_type: "application/octet-stream".to_string(),
                last_modified,
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<StoredBlob> {
        self.objects.read().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Number of `list` calls served so far
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn public_url(&self, key: &str) -> String {
        compose_public_url(&self.public_base_url, key)
    }

    async fn put(&self, data: Vec<u8>, key: &str, content_type: &str) -> Result<String> {
        self.objects.write().insert(
            key.to_string(),
            StoredBlob {
                data,
                content_type: content_type.to_string(),
                last_modified: Utc::now(),
            },
        );
        Ok(self.public_url(key))
    }

    async fn list(&self, prefix: &str, max_keys: i32) -> Result<Vec<ObjectMeta>> {
        self.list_calls.fetch_add(1, Ordering::Relaxed);
        let prefix = format!("{}/", prefix);
        let limit = usize::try_from(max_keys).unwrap_or(0);

        Ok(self
            .objects
            .read()
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .take(limit)
            .map(|(key, blob)| ObjectMeta {
                key: key.clone(),
                last_modified: blob.last_modified,
            })
            .collect())
    }
}
