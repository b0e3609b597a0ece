//! Media relay - copies ephemeral provider media into durable object storage

pub mod download;
pub mod naming;
pub mod upload_pool;

use reqwest::header::HeaderMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::RelayConfig;
use crate::error::{AppError, Result};
use crate::media::MediaKind;
use crate::retry::RetryPolicy;
use crate::storage::ObjectStore;

pub use download::Downloader;
pub use upload_pool::UploadPool;

/// Download/upload limits for one media kind
#[derive(Debug, Clone)]
pub struct TransferLimits {
    pub download_timeout: Duration,
    pub upload_timeout: Duration,
    pub retry: RetryPolicy,
}

/// Result of a successful relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub durable_url: String,
}

pub struct MediaRelay {
    downloader: Downloader,
    uploads: UploadPool,
    image: TransferLimits,
    video: TransferLimits,
}

impl MediaRelay {
    pub fn new(
        client: reqwest::Client,
        store: Arc<dyn ObjectStore>,
        workers: usize,
        config: &RelayConfig,
    ) -> Self {
        Self {
            downloader: Downloader::new(client),
            uploads: UploadPool::new(store, workers),
            image: TransferLimits {
                download_timeout: Duration::from_secs(config.image_download_timeout_secs),
                upload_timeout: Duration::from_secs(config.image_upload_timeout_secs),
                retry: RetryPolicy::from(&config.image_retry),
            },
            video: TransferLimits {
                download_timeout: Duration::from_secs(config.video_download_timeout_secs),
                upload_timeout: Duration::from_secs(config.video_upload_timeout_secs),
                retry: RetryPolicy::from(&config.video_retry),
            },
        }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        self.uploads.store()
    }

    pub fn limits(&self, kind: MediaKind) -> &TransferLimits {
        match kind {
            MediaKind::Image => &self.image,
            MediaKind::Video => &self.video,
        }
    }

    /// Download `source_url` and store it under `folder`.
    ///
    /// Never fails loudly: any download or upload problem is logged and
    /// yields `None`, and the caller keeps the ephemeral URL.
    pub async fn relay(
        &self,
        source_url: &str,
        folder: &str,
        kind: MediaKind,
        headers: &HeaderMap,
    ) -> Option<StoredObject> {
        match self.try_relay(source_url, folder, kind, headers).await {
            Ok(stored) => Some(stored),
            Err(e) => {
                warn!(source = %source_url, folder = %folder, error = %e, "Relay failed");
                None
            }
        }
    }

    async fn try_relay(
        &self,
        source_url: &str,
        folder: &str,
        kind: MediaKind,
        headers: &HeaderMap,
    ) -> Result<StoredObject> {
        if !self.store().is_enabled() {
            return Err(AppError::StoreDisabled);
        }

        let limits = self.limits(kind);
        let data = self
            .downloader
            .fetch(source_url, headers, limits.download_timeout, &limits.retry)
            .await?;

        self.store_bytes(data, folder, kind).await
    }

    /// Store media already held in memory
    pub async fn store_bytes(
        &self,
        data: Vec<u8>,
        folder: &str,
        kind: MediaKind,
    ) -> Result<StoredObject> {
        if !self.store().is_enabled() {
            return Err(AppError::StoreDisabled);
        }
        if data.is_empty() {
            return Err(AppError::InvalidRequest("no media data".to_string()));
        }

        let (ext, content_type) = kind.sniff(&data);
        let key = naming::object_key(folder, &naming::generate_filename(ext));
        let size = data.len();

        let durable_url = self
            .uploads
            .put(data, key.clone(), content_type, self.limits(kind).upload_timeout)
            .await?;

        info!(key = %key, size = size, url = %durable_url, "Relayed media to storage");
        Ok(StoredObject { key, durable_url })
    }
}
