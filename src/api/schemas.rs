//! Request and response bodies for the HTTP API

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::media::MediaKind;
use crate::provider::replicate::{IDEOGRAM_MODEL, IMAGEN_MODEL};
use crate::provider::{GenerationJob, JobParameters, ProviderKind};

fn default_aspect_ratio() -> String {
    "16:9".to_string()
}

fn default_size() -> u32 {
    1024
}

/// Seconds given either as a number or as a numeric string ("5")
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Seconds {
    Number(u32),
    Text(String),
}

impl Seconds {
    pub fn value(&self) -> Result<u32> {
        match self {
            Seconds::Number(n) => Ok(*n),
            Seconds::Text(text) => text.trim().parse().map_err(|_| {
                AppError::InvalidRequest(format!("duration must be a number, got '{}'", text))
            }),
        }
    }
}

/// APIFrame image generation
#[derive(Debug, Deserialize)]
pub struct ApiframeRequest {
    pub prompt: String,
    #[serde(default = "default_apiframe_model")]
    pub model: String,
    #[serde(default)]
    pub source_image: Option<String>,
    #[serde(default)]
    pub aspect_ratio: Option<String>,
}

fn default_apiframe_model() -> String {
    "ideogram".to_string()
}

impl ApiframeRequest {
    pub fn into_job(self) -> Result<GenerationJob> {
        let provider = match self.model.parse::<ProviderKind>()? {
            kind @ (ProviderKind::Ideogram | ProviderKind::Flux | ProviderKind::NanoBanana) => kind,
            other => {
                return Err(AppError::InvalidRequest(format!(
                    "'{}' is not an APIFrame model",
                    other
                )))
            }
        };

        Ok(GenerationJob::new(provider, self.prompt)
            .with_source_images(self.source_image.into_iter().collect())
            .with_parameters(JobParameters {
                aspect_ratio: self.aspect_ratio,
                ..JobParameters::default()
            }))
    }
}

/// Pollinations text-to-image
#[derive(Debug, Deserialize)]
pub struct PollinationsRequest {
    pub prompt: String,
    #[serde(default = "default_pollinations_model")]
    pub model: String,
    #[serde(default = "default_size")]
    pub width: u32,
    #[serde(default = "default_size")]
    pub height: u32,
    #[serde(default)]
    pub seed: Option<i64>,
}

fn default_pollinations_model() -> String {
    "flux".to_string()
}

impl PollinationsRequest {
    pub fn into_job(self) -> GenerationJob {
        GenerationJob::new(ProviderKind::Pollinations, self.prompt)
            .with_model(self.model)
            .with_parameters(JobParameters {
                width: Some(self.width),
                height: Some(self.height),
                seed: self.seed,
                ..JobParameters::default()
            })
    }
}

/// Pollinations image edit
#[derive(Debug, Deserialize)]
pub struct PollinationsImg2ImgRequest {
    pub prompt: String,
    pub image_url: String,
    #[serde(default = "default_edit_model")]
    pub model: String,
    #[serde(default)]
    pub seed: Option<i64>,
}

fn default_edit_model() -> String {
    "kontext".to_string()
}

impl PollinationsImg2ImgRequest {
    pub fn into_job(self) -> GenerationJob {
        GenerationJob::new(ProviderKind::Pollinations, self.prompt)
            .with_model(self.model)
            .with_source_images(vec![self.image_url])
            .with_parameters(JobParameters {
                seed: self.seed,
                ..JobParameters::default()
            })
    }
}

/// Pollinations video
#[derive(Debug, Deserialize)]
pub struct PollinationsVideoRequest {
    pub prompt: String,
    #[serde(default = "default_video_model")]
    pub model: String,
    #[serde(default)]
    pub duration: Option<Seconds>,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub audio: bool,
}

fn default_video_model() -> String {
    "seedance".to_string()
}

impl PollinationsVideoRequest {
    pub fn into_job(self) -> Result<GenerationJob> {
        let duration = self.duration.as_ref().map(Seconds::value).transpose()?;
        Ok(GenerationJob::new(ProviderKind::Pollinations, self.prompt)
            .with_model(self.model)
            .with_media(MediaKind::Video)
            .with_source_images(self.image_url.into_iter().collect())
            .with_parameters(JobParameters {
                duration,
                aspect_ratio: Some(self.aspect_ratio),
                audio: Some(self.audio),
                ..JobParameters::default()
            }))
    }
}

/// Prompt optimizer
#[derive(Debug, Deserialize)]
pub struct PollinationsTextRequest {
    pub prompt: String,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OptimizedPrompt {
    pub optimized_prompt: String,
}

/// Kling text-to-video or image-to-video
#[derive(Debug, Deserialize)]
pub struct KlingVideoRequest {
    pub prompt: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub duration: Option<Seconds>,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub negative_prompt: Option<String>,
    #[serde(default)]
    pub cfg_scale: Option<f32>,
}

impl KlingVideoRequest {
    pub fn into_job(self) -> Result<GenerationJob> {
        let duration = self.duration.as_ref().map(Seconds::value).transpose()?;
        let mut job = GenerationJob::new(ProviderKind::Kling, self.prompt)
            .with_media(MediaKind::Video)
            .with_source_images(self.image_url.into_iter().collect())
            .with_parameters(JobParameters {
                mode: self.mode,
                duration,
                aspect_ratio: Some(self.aspect_ratio),
                negative_prompt: self.negative_prompt,
                cfg_scale: self.cfg_scale,
                ..JobParameters::default()
            });
        job.model = self.model;
        Ok(job)
    }
}

/// Kling multi-image (elements) video
#[derive(Debug, Deserialize)]
pub struct KlingMultiImageRequest {
    pub prompt: String,
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub duration: Option<Seconds>,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
    #[serde(default)]
    pub negative_prompt: Option<String>,
}

impl KlingMultiImageRequest {
    pub fn into_job(self) -> Result<GenerationJob> {
        let duration = self.duration.as_ref().map(Seconds::value).transpose()?;
        Ok(GenerationJob::new(ProviderKind::Kling, self.prompt)
            .with_media(MediaKind::Video)
            .with_source_images(self.image_urls)
            .with_parameters(JobParameters {
                mode: self.mode,
                duration,
                aspect_ratio: Some(self.aspect_ratio),
                negative_prompt: self.negative_prompt,
                multi_image: Some(true),
                ..JobParameters::default()
            }))
    }
}

#[derive(Debug, Serialize)]
pub struct KlingStatus {
    pub configured: bool,
    pub has_access_key: bool,
    pub has_secret_key: bool,
}

/// Replicate Imagen 4
#[derive(Debug, Deserialize)]
pub struct ImagenRequest {
    pub prompt: String,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
}

impl ImagenRequest {
    pub fn into_job(self) -> GenerationJob {
        GenerationJob::new(ProviderKind::Replicate, self.prompt)
            .with_model(IMAGEN_MODEL)
            .with_parameters(JobParameters {
                aspect_ratio: Some(self.aspect_ratio),
                ..JobParameters::default()
            })
    }
}

/// Replicate Ideogram v3
#[derive(Debug, Deserialize)]
pub struct IdeogramRequest {
    pub prompt: String,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
    #[serde(default)]
    pub style_type: Option<String>,
    #[serde(default)]
    pub magic_prompt_option: Option<String>,
}

impl IdeogramRequest {
    pub fn into_job(self) -> GenerationJob {
        GenerationJob::new(ProviderKind::Replicate, self.prompt)
            .with_model(IDEOGRAM_MODEL)
            .with_parameters(JobParameters {
                aspect_ratio: Some(self.aspect_ratio),
                style_type: self.style_type,
                magic_prompt_option: self.magic_prompt_option,
                ..JobParameters::default()
            })
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub storage_enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub status: String,
    pub target: String,
    pub count: usize,
}
