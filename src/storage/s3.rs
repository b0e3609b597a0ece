//! S3-compatible object store (Backblaze B2, MinIO, AWS)

use async_trait::async_trait;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use chrono::DateTime;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::StorageConfig;
use crate::error::{AppError, Result};
use crate::storage::traits::{compose_public_url, ObjectMeta, ObjectStore};

pub struct S3Store {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl S3Store {
    /// Build a client from settings. Callers check credentials first.
    pub fn new(config: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "genmedia-settings",
        );

        let timeouts = TimeoutConfig::builder()
            .connect_timeout(Duration::from_secs(10))
            .read_timeout(Duration::from_secs(30))
            .build();

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(config.endpoint.clone())
            .credentials_provider(credentials)
            .force_path_style(true)
            .retry_config(RetryConfig::standard().with_max_attempts(2))
            .timeout_config(timeouts)
            .build();

        info!(bucket = %config.bucket, endpoint = %config.endpoint, "S3 client initialized");

        Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            public_base_url: config.public_base_url.clone(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn name(&self) -> &str {
        "s3"
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn public_url(&self, key: &str) -> String {
        compose_public_url(&self.public_base_url, key)
    }

    async fn put(&self, data: Vec<u8>, key: &str, content_type: &str) -> Result<String> {
        let size = data.len();
        let started = Instant::now();
        debug!(key = %key, size = size, "Starting object upload");

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                warn!(key = %key, error = %DisplayErrorContext(&e), "Object upload failed");
                AppError::Storage(format!("put {} failed: {}", key, DisplayErrorContext(&e)))
            })?;

        let url = self.public_url(key);
        info!(
            key = %key,
            size = size,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Uploaded object"
        );
        Ok(url)
    }

    async fn list(&self, prefix: &str, max_keys: i32) -> Result<Vec<ObjectMeta>> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(format!("{}/", prefix))
            .max_keys(max_keys)
            .send()
            .await
            .map_err(|e| {
                AppError::Storage(format!("list {} failed: {}", prefix, DisplayErrorContext(&e)))
            })?;

        let objects: Vec<ObjectMeta> = output
            .contents()
            .iter()
            .filter_map(|object| {
                let key = object.key()?;
                let modified = object.last_modified()?;
                let last_modified =
                    DateTime::from_timestamp(modified.secs(), modified.subsec_nanos())?;
                Some(ObjectMeta {
                    key: key.to_string(),
                    last_modified,
                })
            })
            .collect();

        debug!(prefix = %prefix, count = objects.len(), "Listed objects");
        Ok(objects)
    }
}
