//! Object storage adapters - S3, in-memory, and the disabled fallback

pub mod memory;
pub mod s3;
pub mod traits;

pub use memory::MemoryStore;
pub use s3::S3Store;
pub use traits::{compose_public_url, ObjectMeta, ObjectStore};

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::StorageConfig;
use crate::error::{AppError, Result};

/// Stand-in when no credentials are configured. Writes fail with
/// `StoreDisabled`, listings are empty, so generation keeps working with
/// ephemeral provider URLs.
pub struct DisabledStore {
    public_base_url: String,
}

impl DisabledStore {
    pub fn new(public_base_url: impl Into<String>) -> Self {
        Self {
            public_base_url: public_base_url.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for DisabledStore {
    fn name(&self) -> &str {
        "disabled"
    }

    fn is_enabled(&self) -> bool {
        false
    }

    fn public_url(&self, key: &str) -> String {
        compose_public_url(&self.public_base_url, key)
    }

    async fn put(&self, _data: Vec<u8>, key: &str, _content_type: &str) -> Result<String> {
        debug!(key = %key, "Skipping upload, storage disabled");
        Err(AppError::StoreDisabled)
    }

    async fn list(&self, _prefix: &str, _max_keys: i32) -> Result<Vec<ObjectMeta>> {
        Ok(Vec::new())
    }
}

/// Build the configured store
pub fn from_config(config: &StorageConfig) -> Arc<dyn ObjectStore> {
    match config.backend.as_str() {
        "memory" => Arc::new(MemoryStore::new(config.public_base_url.clone())),
        _ if config.has_credentials() => Arc::new(S3Store::new(config)),
        _ => {
            warn!("Storage credentials not configured - media will not be uploaded");
            Arc::new(DisabledStore::new(config.public_base_url.clone()))
        }
    }
}
