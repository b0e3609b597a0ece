//! Common traits and types for media generation providers

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::config::PollConfig;
use crate::error::{AppError, Result};
use crate::gallery::GallerySource;
use crate::media::MediaKind;

/// Every provider the gateway can drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    Ideogram,
    Flux,
    NanoBanana,
    Kling,
    Pollinations,
    Replicate,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 6] = [
        ProviderKind::Ideogram,
        ProviderKind::Flux,
        ProviderKind::NanoBanana,
        ProviderKind::Kling,
        ProviderKind::Pollinations,
        ProviderKind::Replicate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Ideogram => "ideogram",
            ProviderKind::Flux => "flux",
            ProviderKind::NanoBanana => "nano-banana",
            ProviderKind::Kling => "kling",
            ProviderKind::Pollinations => "pollinations",
            ProviderKind::Replicate => "replicate",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ideogram" => Ok(ProviderKind::Ideogram),
            "flux" => Ok(ProviderKind::Flux),
            "nano-banana" | "nano_banana" | "nanobanana" => Ok(ProviderKind::NanoBanana),
            "kling" => Ok(ProviderKind::Kling),
            "pollinations" => Ok(ProviderKind::Pollinations),
            "replicate" => Ok(ProviderKind::Replicate),
            other => Err(AppError::InvalidRequest(format!(
                "Unknown provider '{}'",
                other
            ))),
        }
    }
}

/// Optional knobs a job may carry. Providers ignore what they do not support.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    /// Seed for reproducibility; providers that need one default to the clock
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,

    /// Video length in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,

    /// Kling quality mode ("std", "pro")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cfg_scale: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magic_prompt_option: Option<String>,

    /// Generate an audio track where the model supports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<bool>,

    /// Treat source images as Kling reference elements even when there is one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_image: Option<bool>,
}

/// One user request, immutable once submitted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationJob {
    pub provider: ProviderKind,

    /// Provider-specific model name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    pub prompt: String,

    #[serde(default)]
    pub parameters: JobParameters,

    /// Input image URLs for image-to-image and image-to-video
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_images: Vec<String>,

    #[serde(default)]
    pub media: MediaKind,
}

impl GenerationJob {
    pub fn new(provider: ProviderKind, prompt: impl Into<String>) -> Self {
        Self {
            provider,
            model: None,
            prompt: prompt.into(),
            parameters: JobParameters::default(),
            source_images: Vec::new(),
            media: MediaKind::Image,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_media(mut self, media: MediaKind) -> Self {
        self.media = media;
        self
    }

    pub fn with_source_images(mut self, images: Vec<String>) -> Self {
        self.source_images = images;
        self
    }

    pub fn with_parameters(mut self, parameters: JobParameters) -> Self {
        self.parameters = parameters;
        self
    }
}

/// Reference to an accepted asynchronous task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHandle {
    pub task_id: String,
    pub provider: ProviderKind,
    pub submitted_at: DateTime<Utc>,
    /// Status endpoint for this task
    pub poll_url: String,
}

impl TaskHandle {
    pub fn new(provider: ProviderKind, task_id: impl Into<String>, poll_url: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            provider,
            submitted_at: Utc::now(),
            poll_url: poll_url.into(),
        }
    }
}

/// A finished result plus whatever headers fetching it requires
#[derive(Debug, Clone)]
pub struct ResultRef {
    pub url: String,
    pub download_headers: HeaderMap,
}

impl ResultRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            download_headers: HeaderMap::new(),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.download_headers = headers;
        self
    }
}

/// What a submission produced
#[derive(Debug, Clone)]
pub enum Submission {
    /// Accepted for background processing; poll it
    Task(TaskHandle),
    /// The provider answered synchronously
    Completed(ResultRef),
}

/// Status of a task as of one poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResult {
    Pending,
    Succeeded { result_url: String },
    Failed { reason: String },
}

/// Polling budget: at most `max_attempts` status queries, `interval` apart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
    /// Timeout for one status query
    pub request_timeout: Duration,
}

impl PollPolicy {
    /// Upper bound on wall time spent sleeping between queries
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

impl From<&PollConfig> for PollPolicy {
    fn from(config: &PollConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.poll_interval_ms),
            max_attempts: config.max_poll_attempts,
            request_timeout: Duration::from_secs(config.poll_timeout_secs),
        }
    }
}

/// A fully built provider call, before it is sent
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
}

impl ProviderRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            body: Some(body),
        }
    }
}

/// Where a job's result lands once relayed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub source: GallerySource,
    /// Label recorded on the catalog entry
    pub label: String,
}

impl Destination {
    pub fn new(source: GallerySource, label: impl Into<String>) -> Self {
        Self {
            source,
            label: label.into(),
        }
    }
}

/// Trait for media generation providers
#[async_trait]
pub trait MediaProvider: Send + Sync {
    /// Which provider this is
    fn kind(&self) -> ProviderKind;

    /// Whether credentials are present
    fn is_configured(&self) -> bool;

    fn poll_policy(&self) -> PollPolicy;

    /// Gallery and label a job from this provider is stored under
    fn destination(&self, job: &GenerationJob) -> Destination;

    /// Translate a job into the provider's request. Fails on jobs the
    /// provider cannot express, before anything is sent.
    fn build_payload(&self, job: &GenerationJob) -> Result<ProviderRequest>;

    /// Single submission call. Never retried.
    async fn submit(&self, job: &GenerationJob) -> Result<Submission>;

    /// One status query
    async fn poll(&self, task: &TaskHandle, timeout: Duration) -> Result<PollResult>;
}
