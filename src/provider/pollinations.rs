//! Pollinations provider - free image, image edit and video generation
//!
//! Pollinations generates on fetch: the request URL is the result URL, so
//! submission never touches the network and the relay download does the work.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::config::PollinationsConfig;
use crate::error::{AppError, Result};
use crate::gallery::GallerySource;
use crate::media::MediaKind;
use crate::provider::traits::{
    Destination, GenerationJob, MediaProvider, PollPolicy, PollResult, ProviderKind,
    ProviderRequest, ResultRef, Submission, TaskHandle,
};
use crate::provider::transport;

const QUALITY_BOOSTER: &str = ", masterpiece, best quality, ultra detailed, 8K UHD resolution, \
professional photography, sharp focus, intricate details, \
cinematic lighting, soft natural bokeh, high dynamic range, \
photorealistic, award-winning, trending on artstation";

const NEGATIVE_PROMPT: &str = "blurry, low quality, bad anatomy, bad hands, distorted, \
watermark, text, signature, low resolution, ugly, deformed";

const EDIT_SUFFIX: &str = ". ISOLATED EDIT ONLY. The original image content must remain immutable \
except for the specific requested change. Do not add, remove, or modify any other elements, \
background, or style. Highest quality preservation of the source image.";

const PROMPT_OPTIMIZER_SYSTEM: &str = "You are an expert AI image prompt engineer. Your task is to \
transform simple user descriptions into detailed, optimized prompts for AI image generation.

Rules:
1. Keep the core idea from the user's input
2. Add specific details about: lighting, composition, style, mood, colors
3. Include quality enhancers like: \"masterpiece\", \"highly detailed\", \"8K resolution\"
4. Mention technical terms like: \"depth of field\", \"volumetric lighting\", \"cinematic\"
5. Keep it concise but descriptive (max 200 words)
6. Output ONLY the optimized prompt, nothing else
";

const DEFAULT_IMAGE_MODEL: &str = "flux";
const DEFAULT_EDIT_MODEL: &str = "kontext";
const DEFAULT_VIDEO_MODEL: &str = "seedance";
pub const DEFAULT_TEXT_MODEL: &str = "openai";
const DEFAULT_SIZE: u32 = 1024;
const DEFAULT_VIDEO_DURATION: u32 = 4;
const DEFAULT_VIDEO_ASPECT: &str = "16:9";
const GALLERY_LABEL: &str = "pollinations";

/// Models Pollinations serves, grouped by task
#[derive(Debug, Clone, Serialize)]
pub struct ModelCatalog {
    pub text2img: &'static [&'static str],
    pub img2img: &'static [&'static str],
    pub text2video: &'static [&'static str],
    pub img2video: &'static [&'static str],
    pub text: &'static [&'static str],
}

pub static MODEL_CATALOG: ModelCatalog = ModelCatalog {
    text2img: &[
        "flux",
        "zimage",
        "turbo",
        "gptimage",
        "seedream",
        "seedream-pro",
        "nanobanana",
        "nanobanana-pro",
    ],
    img2img: &["kontext", "gptimage", "nanobanana", "nanobanana-pro", "seedance"],
    text2video: &["veo", "seedance", "seedance-pro"],
    img2video: &["seedance", "seedance-pro"],
    text: &["openai", "openai-fast", "openai-large", "qwen-coder", "mistral"],
};

pub struct PollinationsProvider {
    client: Client,
    config: PollinationsConfig,
}

impl PollinationsProvider {
    pub fn new(client: Client, config: PollinationsConfig) -> Self {
        Self { client, config }
    }

    pub fn models(&self) -> &'static ModelCatalog {
        &MODEL_CATALOG
    }

    /// Bearer header when a key is configured; the free tier needs none
    fn headers(&self) -> Result<HeaderMap> {
        if self.config.api_key.is_empty() {
            Ok(HeaderMap::new())
        } else {
            transport::bearer(&self.config.api_key)
        }
    }

    /// `{base}/{kind}/{prompt}` with the prompt as one encoded path segment
    fn endpoint(&self, kind: &str, prompt: &str) -> Result<Url> {
        let mut url = Url::parse(&self.config.base_url).map_err(|e| {
            AppError::Internal(format!(
                "Invalid Pollinations base URL '{}': {}",
                self.config.base_url, e
            ))
        })?;

        url.path_segments_mut()
            .map_err(|_| AppError::Internal("Pollinations base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push(kind)
            .push(prompt);

        Ok(url)
    }

    fn image_url(&self, job: &GenerationJob) -> Result<Url> {
        let params = &job.parameters;
        let mut url = self.endpoint("image", &format!("{}{}", job.prompt, QUALITY_BOOSTER))?;
        url.query_pairs_mut()
            .append_pair("model", job.model.as_deref().unwrap_or(DEFAULT_IMAGE_MODEL))
            .append_pair("width", &params.width.unwrap_or(DEFAULT_SIZE).to_string())
            .append_pair("height", &params.height.unwrap_or(DEFAULT_SIZE).to_string())
            .append_pair("seed", &seed(job).to_string())
            .append_pair("enhance", "true")
            .append_pair("nologo", "true")
            .append_pair("negative", NEGATIVE_PROMPT);
        Ok(url)
    }

    fn edit_url(&self, job: &GenerationJob, source: &str) -> Result<Url> {
        if !source.starts_with("http") {
            return Err(AppError::InvalidRequest(
                "Image URL must be a public http(s) URL".to_string(),
            ));
        }

        let mut url = self.endpoint("image", &format!("{}{}", job.prompt, EDIT_SUFFIX))?;
        url.query_pairs_mut()
            .append_pair("model", job.model.as_deref().unwrap_or(DEFAULT_EDIT_MODEL))
            .append_pair("image", source)
            .append_pair("seed", &seed(job).to_string())
            .append_pair("nologo", "true")
            .append_pair("negative", NEGATIVE_PROMPT);
        Ok(url)
    }

    fn video_url(&self, job: &GenerationJob) -> Result<Url> {
        let params = &job.parameters;
        let model = job.model.as_deref().unwrap_or(DEFAULT_VIDEO_MODEL);

        let mut url = self.endpoint("image", &job.prompt)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("model", model)
                .append_pair(
                    "duration",
                    &params.duration.unwrap_or(DEFAULT_VIDEO_DURATION).to_string(),
                )
                .append_pair(
                    "aspectRatio",
                    params.aspect_ratio.as_deref().unwrap_or(DEFAULT_VIDEO_ASPECT),
                )
                .append_pair("seed", &seed(job).to_string());

            if let Some(image) = job.source_images.first() {
                query.append_pair("image", image);
            }

            // only veo renders audio
            if params.audio == Some(true) && model == "veo" {
                query.append_pair("audio", "true");
            }
        }
        Ok(url)
    }

    /// Rewrite a short description into a detailed generation prompt
    pub async fn optimize_prompt(&self, prompt: &str, model: Option<&str>) -> Result<String> {
        let model = model.unwrap_or(DEFAULT_TEXT_MODEL);
        let mut url = self.endpoint("text", prompt)?;
        url.query_pairs_mut()
            .append_pair("model", model)
            .append_pair("system", PROMPT_OPTIMIZER_SYSTEM)
            .append_pair("seed", &Utc::now().timestamp().to_string());

        debug!(model = %model, "Optimizing prompt");

        let response = self
            .client
            .get(url)
            .headers(self.headers()?)
            .timeout(Duration::from_secs(self.config.text_timeout_secs))
            .send()
            .await
            .map_err(|e| AppError::submission(self.kind().as_str(), e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::submission(self.kind().as_str(), e.to_string()))?;

        if !status.is_success() {
            return Err(AppError::submission(
                self.kind().as_str(),
                format!("HTTP {}: {}", status.as_u16(), text.trim()),
            ));
        }

        let optimized = text.trim().to_string();
        info!(model = %model, length = optimized.len(), "Prompt optimized");
        Ok(optimized)
    }
}

fn seed(job: &GenerationJob) -> i64 {
    job.parameters
        .seed
        .unwrap_or_else(|| Utc::now().timestamp())
}

#[async_trait]
impl MediaProvider for PollinationsProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Pollinations
    }

    /// The free tier works without a key
    fn is_configured(&self) -> bool {
        true
    }

    fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::ZERO,
            max_attempts: 1,
            request_timeout: Duration::from_secs(self.config.text_timeout_secs),
        }
    }

    fn destination(&self, job: &GenerationJob) -> Destination {
        match job.media {
            MediaKind::Image => Destination::new(GallerySource::Omnigen, GALLERY_LABEL),
            MediaKind::Video => Destination::new(GallerySource::Video, GALLERY_LABEL),
        }
    }

    fn build_payload(&self, job: &GenerationJob) -> Result<ProviderRequest> {
        let url = match (job.media, job.source_images.first()) {
            (MediaKind::Video, _) => self.video_url(job)?,
            (MediaKind::Image, Some(source)) => self.edit_url(job, source)?,
            (MediaKind::Image, None) => self.image_url(job)?,
        };
        Ok(ProviderRequest::get(url.to_string()))
    }

    async fn submit(&self, job: &GenerationJob) -> Result<Submission> {
        let request = self.build_payload(job)?;
        debug!(media = job.media.as_str(), url = %request.url, "Built Pollinations request URL");
        Ok(Submission::Completed(
            ResultRef::new(request.url).with_headers(self.headers()?),
        ))
    }

    async fn poll(&self, task: &TaskHandle, _timeout: Duration) -> Result<PollResult> {
        Err(AppError::Internal(format!(
            "Pollinations has no background tasks (task {})",
            task.task_id
        )))
    }
}
