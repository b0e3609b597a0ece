//! Application settings and configuration management

use crate::error::{AppError, Result};
use config::builder::{ConfigBuilder, DefaultState};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub gallery: GalleryConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Object storage configuration (S3-compatible, Backblaze B2 by default)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// `s3`, or `memory` for local development
    #[serde(default = "default_storage_backend")]
    pub backend: String,
    #[serde(default)]
    pub access_key_id: String,
    #[serde(default)]
    pub secret_access_key: String,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Public base the durable URLs are composed from
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    #[serde(default = "default_image_list_limit")]
    pub image_list_limit: i32,
    #[serde(default = "default_video_list_limit")]
    pub video_list_limit: i32,
    #[serde(default = "default_upload_workers")]
    pub upload_workers: usize,
}

fn default_storage_backend() -> String {
    "s3".to_string()
}

fn default_bucket() -> String {
    "cinematic-ai".to_string()
}

fn default_endpoint() -> String {
    "https://s3.us-east-005.backblazeb2.com".to_string()
}

fn default_region() -> String {
    "us-east-005".to_string()
}

fn default_public_base_url() -> String {
    "https://zipimgs.com/file/Lemiex-Fulfillment".to_string()
}

fn default_image_list_limit() -> i32 {
    500
}

fn default_video_list_limit() -> i32 {
    200
}

fn default_upload_workers() -> usize {
    5
}

impl StorageConfig {
    pub fn has_credentials(&self) -> bool {
        !self.access_key_id.is_empty() && !self.secret_access_key.is_empty()
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            bucket: default_bucket(),
            endpoint: default_endpoint(),
            region: default_region(),
            public_base_url: default_public_base_url(),
            image_list_limit: default_image_list_limit(),
            video_list_limit: default_video_list_limit(),
            upload_workers: default_upload_workers(),
        }
    }
}

/// Retry settings for rate-limited downloads
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

/// Media relay timeouts and retry schedules
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
    #[serde(default = "default_image_download_timeout")]
    pub image_download_timeout_secs: u64,
    #[serde(default = "default_video_download_timeout")]
    pub video_download_timeout_secs: u64,
    #[serde(default = "default_image_upload_timeout")]
    pub image_upload_timeout_secs: u64,
    #[serde(default = "default_video_upload_timeout")]
    pub video_upload_timeout_secs: u64,
    #[serde(default = "default_image_retry")]
    pub image_retry: RetryConfig,
    #[serde(default = "default_video_retry")]
    pub video_retry: RetryConfig,
}

fn default_image_download_timeout() -> u64 {
    120
}

fn default_video_download_timeout() -> u64 {
    300
}

fn default_image_upload_timeout() -> u64 {
    60
}

fn default_video_upload_timeout() -> u64 {
    180
}

fn default_image_retry() -> RetryConfig {
    RetryConfig {
        max_retries: 3,
        base_delay_ms: 3_000,
    }
}

fn default_video_retry() -> RetryConfig {
    RetryConfig {
        max_retries: 3,
        base_delay_ms: 5_000,
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            image_download_timeout_secs: default_image_download_timeout(),
            video_download_timeout_secs: default_video_download_timeout(),
            image_upload_timeout_secs: default_image_upload_timeout(),
            video_upload_timeout_secs: default_video_upload_timeout(),
            image_retry: default_image_retry(),
            video_retry: default_video_retry(),
        }
    }
}

/// Gallery cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GalleryConfig {
    #[serde(default = "default_gallery_ttl")]
    pub ttl_secs: u64,
}

fn default_gallery_ttl() -> u64 {
    300
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_gallery_ttl(),
        }
    }
}

/// Submission and polling budget for an asynchronous provider
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollConfig {
    pub submit_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
    pub poll_timeout_secs: u64,
}

impl PollConfig {
    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs)
    }
}

/// APIFrame (Ideogram, Flux, Nano Banana)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiframeConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_apiframe_base")]
    pub base_url: String,
    #[serde(default = "default_apiframe_poll")]
    pub poll: PollConfig,
}

fn default_apiframe_base() -> String {
    "https://api.apiframe.pro".to_string()
}

fn default_apiframe_poll() -> PollConfig {
    PollConfig {
        submit_timeout_secs: 60,
        poll_interval_ms: 3_000,
        max_poll_attempts: 20,
        poll_timeout_secs: 120,
    }
}

impl Default for ApiframeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_apiframe_base(),
            poll: default_apiframe_poll(),
        }
    }
}

/// Kling AI video
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KlingConfig {
    #[serde(default)]
    pub access_key: String,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default = "default_kling_base")]
    pub base_url: String,
    #[serde(default = "default_kling_poll")]
    pub poll: PollConfig,
}

fn default_kling_base() -> String {
    "https://api.klingai.com".to_string()
}

fn default_kling_poll() -> PollConfig {
    PollConfig {
        submit_timeout_secs: 60,
        poll_interval_ms: 5_000,
        max_poll_attempts: 120,
        poll_timeout_secs: 30,
    }
}

impl Default for KlingConfig {
    fn default() -> Self {
        Self {
            access_key: String::new(),
            secret_key: String::new(),
            base_url: default_kling_base(),
            poll: default_kling_poll(),
        }
    }
}

/// Pollinations (free tier image and video)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollinationsConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_pollinations_base")]
    pub base_url: String,
    #[serde(default = "default_text_timeout")]
    pub text_timeout_secs: u64,
}

fn default_pollinations_base() -> String {
    "https://gen.pollinations.ai".to_string()
}

fn default_text_timeout() -> u64 {
    60
}

impl Default for PollinationsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_pollinations_base(),
            text_timeout_secs: default_text_timeout(),
        }
    }
}

/// Replicate (Imagen 4, Ideogram v3)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReplicateConfig {
    #[serde(default)]
    pub api_token: String,
    #[serde(default = "default_replicate_base")]
    pub base_url: String,
    #[serde(default = "default_replicate_poll")]
    pub poll: PollConfig,
}

fn default_replicate_base() -> String {
    "https://api.replicate.com".to_string()
}

fn default_replicate_poll() -> PollConfig {
    PollConfig {
        submit_timeout_secs: 60,
        poll_interval_ms: 3_000,
        max_poll_attempts: 60,
        poll_timeout_secs: 30,
    }
}

impl Default for ReplicateConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            base_url: default_replicate_base(),
            poll: default_replicate_poll(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub apiframe: ApiframeConfig,
    #[serde(default)]
    pub kling: KlingConfig,
    #[serde(default)]
    pub pollinations: PollinationsConfig,
    #[serde(default)]
    pub replicate: ReplicateConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `json` or `pretty`
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Settings {
    /// Load settings from configuration files and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/default.toml")
    }

    /// Load settings from a specific configuration file path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", i64::from(default_port()))?;

        // nested budgets are seeded key by key so a single override merges over them
        for (prefix, poll) in [
            ("providers.apiframe.poll", default_apiframe_poll()),
            ("providers.kling.poll", default_kling_poll()),
            ("providers.replicate.poll", default_replicate_poll()),
        ] {
            builder = with_poll_defaults(builder, prefix, &poll)?;
        }
        for (prefix, retry) in [
            ("relay.image_retry", default_image_retry()),
            ("relay.video_retry", default_video_retry()),
        ] {
            builder = with_retry_defaults(builder, prefix, &retry)?;
        }

        let config = builder
            .add_source(
                File::with_name(path.as_ref().to_str().unwrap_or("config/default")).required(false),
            )
            // Override with environment variables, e.g. GENMEDIA__STORAGE__BUCKET
            .add_source(
                Environment::with_prefix("GENMEDIA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(invalid("Server port cannot be 0"));
        }

        if !["s3", "memory"].contains(&self.storage.backend.as_str()) {
            return Err(invalid(format!(
                "Invalid storage backend '{}'. Must be 's3' or 'memory'",
                self.storage.backend
            )));
        }

        if self.storage.upload_workers == 0 {
            return Err(invalid("storage.upload_workers must be at least 1"));
        }

        let polls = [
            ("apiframe", &self.providers.apiframe.poll),
            ("kling", &self.providers.kling.poll),
            ("replicate", &self.providers.replicate.poll),
        ];
        for (name, poll) in polls {
            if poll.max_poll_attempts == 0 {
                return Err(invalid(format!(
                    "Provider '{}' must allow at least one poll attempt",
                    name
                )));
            }
        }

        Ok(())
    }
}

fn int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn with_poll_defaults(
    builder: ConfigBuilder<DefaultState>,
    prefix: &str,
    poll: &PollConfig,
) -> Result<ConfigBuilder<DefaultState>> {
    Ok(builder
        .set_default(
            format!("{}.submit_timeout_secs", prefix),
            int(poll.submit_timeout_secs),
        )?
        .set_default(
            format!("{}.poll_interval_ms", prefix),
            int(poll.poll_interval_ms),
        )?
        .set_default(
            format!("{}.max_poll_attempts", prefix),
            i64::from(poll.max_poll_attempts),
        )?
        .set_default(
            format!("{}.poll_timeout_secs", prefix),
            int(poll.poll_timeout_secs),
        )?)
}

fn with_retry_defaults(
    builder: ConfigBuilder<DefaultState>,
    prefix: &str,
    retry: &RetryConfig,
) -> Result<ConfigBuilder<DefaultState>> {
    Ok(builder
        .set_default(
            format!("{}.max_retries", prefix),
            i64::from(retry.max_retries),
        )?
        .set_default(
            format!("{}.base_delay_ms", prefix),
            int(retry.base_delay_ms),
        )?)
}

fn invalid(message: impl Into<String>) -> AppError {
    AppError::Config(config::ConfigError::Message(message.into()))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            relay: RelayConfig::default(),
            gallery: GalleryConfig::default(),
            providers: ProvidersConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
