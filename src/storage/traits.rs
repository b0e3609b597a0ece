//! Object store contract

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// One listed object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub key: String,
    pub last_modified: DateTime<Utc>,
}

/// Key-value blob store the relay writes to and the gallery relists from.
///
/// `list` returns a single bounded page; there is no continuation-token
/// following. Callers that need more simply relist later.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Whether the store can accept writes at all
    fn is_enabled(&self) -> bool;

    /// Durable public URL for a key. Pure composition, no network.
    fn public_url(&self, key: &str) -> String;

    /// Store `data` under `key`, returning the durable URL
    async fn put(&self, data: Vec<u8>, key: &str, content_type: &str) -> Result<String>;

    /// List up to `max_keys` objects under `<prefix>/`
    async fn list(&self, prefix: &str, max_keys: i32) -> Result<Vec<ObjectMeta>>;
}

/// Join a public base and an object key with exactly one slash
pub fn compose_public_url(base: &str, key: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        key.trim_start_matches('/')
    )
}
