//! Kling video provider

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::KlingConfig;
use crate::error::{AppError, Result};
use crate::gallery::GallerySource;
use crate::provider::schema::{PollSchema, ResultExtractor};
use crate::provider::traits::{
    Destination, GenerationJob, MediaProvider, PollPolicy, PollResult, ProviderKind,
    ProviderRequest, Submission, TaskHandle,
};
use crate::provider::transport;

const DEFAULT_MODEL: &str = "kling-v1-6";
const DEFAULT_MODE: &str = "std";
const DEFAULT_DURATION: u32 = 5;
const DEFAULT_ASPECT_RATIO: &str = "16:9";
const DEFAULT_CFG_SCALE: f32 = 0.5;
const MAX_ELEMENT_IMAGES: usize = 4;

/// Token lifetime and clock-skew allowance
const TOKEN_TTL_SECS: i64 = 1800;
const TOKEN_NOT_BEFORE_SKEW_SECS: i64 = 5;

const STATUS_SCHEMA: PollSchema = PollSchema {
    status_pointer: "/data/task_status",
    done: &["succeed"],
    failed: &["failed"],
    reason_pointers: &["/data/task_status_msg"],
    extractors: &[ResultExtractor::Url("/data/task_result/videos/0/url")],
};

/// Which Kling endpoint a job goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KlingRoute {
    TextToVideo,
    ImageToVideo,
    MultiImage,
}

impl KlingRoute {
    pub fn for_job(job: &GenerationJob) -> Self {
        if job.parameters.multi_image == Some(true) || job.source_images.len() > 1 {
            KlingRoute::MultiImage
        } else if job.source_images.is_empty() {
            KlingRoute::TextToVideo
        } else {
            KlingRoute::ImageToVideo
        }
    }

    pub fn path_segment(&self) -> &'static str {
        match self {
            KlingRoute::TextToVideo => "text2video",
            KlingRoute::ImageToVideo => "image2video",
            KlingRoute::MultiImage => "multi-image2video",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            KlingRoute::MultiImage => "kling-multi",
            _ => "kling",
        }
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    exp: i64,
    nbf: i64,
}

pub struct KlingProvider {
    client: Client,
    config: KlingConfig,
}

impl KlingProvider {
    pub fn new(client: Client, config: KlingConfig) -> Self {
        Self { client, config }
    }

    pub fn has_access_key(&self) -> bool {
        !self.config.access_key.is_empty()
    }

    pub fn has_secret_key(&self) -> bool {
        !self.config.secret_key.is_empty()
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// Short-lived HS256 token signed with the secret key
    pub fn token(&self) -> Result<String> {
        if !self.is_configured() {
            return Err(AppError::ProviderNotConfigured(
                "Kling access and secret keys are not set".to_string(),
            ));
        }

        let now = Utc::now().timestamp();
        let claims = Claims {
            iss: &self.config.access_key,
            exp: now + TOKEN_TTL_SECS,
            nbf: now - TOKEN_NOT_BEFORE_SKEW_SECS,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.secret_key.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Failed to sign Kling token: {}", e)))
    }

    fn headers(&self) -> Result<HeaderMap> {
        transport::bearer(&self.token()?)
    }

    fn single_model_payload(&self, job: &GenerationJob, route: KlingRoute) -> Map<String, Value> {
        let params = &job.parameters;
        let model = job.model.as_deref().unwrap_or(DEFAULT_MODEL);
        let is_v2 = model.starts_with("kling-v2");
        let mode = if model.contains("master") {
            "master"
        } else {
            params.mode.as_deref().unwrap_or(DEFAULT_MODE)
        };

        let mut payload = Map::new();
        payload.insert("model_name".into(), json!(model));
        payload.insert("mode".into(), json!(mode));
        payload.insert("duration".into(), json!(duration(job)));
        payload.insert("prompt".into(), json!(job.prompt));

        match (route, job.source_images.first()) {
            (KlingRoute::ImageToVideo, Some(image)) => {
                payload.insert("image".into(), json!(image));
            }
            _ => {
                payload.insert("aspect_ratio".into(), json!(aspect_ratio(job)));
            }
        }

        if !is_v2 {
            payload.insert(
                "cfg_scale".into(),
                json!(params.cfg_scale.unwrap_or(DEFAULT_CFG_SCALE)),
            );
        }

        if let Some(negative) = params.negative_prompt.as_deref().filter(|n| !n.is_empty()) {
            if !model.contains("v2-5") {
                payload.insert("negative_prompt".into(), json!(negative));
            }
        }

        if model == "kling-v2-6" {
            payload.insert("sound".into(), json!("off"));
        }

        payload
    }

    fn multi_image_payload(&self, job: &GenerationJob) -> Result<Map<String, Value>> {
        let count = job.source_images.len();
        if count == 0 || count > MAX_ELEMENT_IMAGES {
            return Err(AppError::InvalidRequest(format!(
                "Must provide 1-{} images, got {}",
                MAX_ELEMENT_IMAGES, count
            )));
        }

        let image_list: Vec<Value> = job
            .source_images
            .iter()
            .map(|url| json!({ "image": url }))
            .collect();

        let mut payload = Map::new();
        // elements only run on v1.6
        payload.insert("model_name".into(), json!(DEFAULT_MODEL));
        payload.insert(
            "mode".into(),
            json!(job.parameters.mode.as_deref().unwrap_or(DEFAULT_MODE)),
        );
        payload.insert("duration".into(), json!(duration(job)));
        payload.insert("aspect_ratio".into(), json!(aspect_ratio(job)));
        payload.insert("prompt".into(), json!(job.prompt));
        payload.insert("image_list".into(), Value::Array(image_list));

        if let Some(negative) = job
            .parameters
            .negative_prompt
            .as_deref()
            .filter(|n| !n.is_empty())
        {
            payload.insert("negative_prompt".into(), json!(negative));
        }

        Ok(payload)
    }
}

fn duration(job: &GenerationJob) -> String {
    job.parameters
        .duration
        .unwrap_or(DEFAULT_DURATION)
        .to_string()
}

fn aspect_ratio(job: &GenerationJob) -> &str {
    job.parameters
        .aspect_ratio
        .as_deref()
        .unwrap_or(DEFAULT_ASPECT_RATIO)
}

#[async_trait]
impl MediaProvider for KlingProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Kling
    }

    fn is_configured(&self) -> bool {
        self.has_access_key() && self.has_secret_key()
    }

    fn poll_policy(&self) -> PollPolicy {
        PollPolicy::from(&self.config.poll)
    }

    fn destination(&self, job: &GenerationJob) -> Destination {
        Destination::new(GallerySource::Kling, KlingRoute::for_job(job).label())
    }

    fn build_payload(&self, job: &GenerationJob) -> Result<ProviderRequest> {
        let route = KlingRoute::for_job(job);
        let payload = match route {
            KlingRoute::MultiImage => self.multi_image_payload(job)?,
            _ => self.single_model_payload(job, route),
        };

        let url = format!("{}/v1/videos/{}", self.base_url(), route.path_segment());
        Ok(ProviderRequest::post(url, Value::Object(payload)))
    }

    async fn submit(&self, job: &GenerationJob) -> Result<Submission> {
        let request = self.build_payload(job)?;
        let headers = self.headers()?;
        let route = KlingRoute::for_job(job);

        let body = transport::submit_request(
            &self.client,
            self.kind(),
            &request,
            headers,
            self.config.poll.submit_timeout(),
        )
        .await?;

        let code = body.get("code").and_then(Value::as_i64);
        if code != Some(0) {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unexpected response");
            return Err(AppError::submission(
                self.kind().as_str(),
                format!("Kling error (code {:?}): {}", code, message),
            ));
        }

        let task_id = body
            .pointer("/data/task_id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::submission(self.kind().as_str(), "no task_id in response"))?;

        debug!(task_id = %task_id, route = route.path_segment(), "Kling task accepted");
        let poll_url = format!(
            "{}/v1/videos/{}/{}",
            self.base_url(),
            route.path_segment(),
            task_id
        );
        Ok(Submission::Task(TaskHandle::new(self.kind(), task_id, poll_url)))
    }

    async fn poll(&self, task: &TaskHandle, timeout: Duration) -> Result<PollResult> {
        let request = ProviderRequest::get(task.poll_url.clone());
        // tokens expire, so each query signs a fresh one
        let body =
            transport::query_status(&self.client, self.kind(), &request, self.headers()?, timeout)
                .await?;

        Ok(STATUS_SCHEMA.interpret(&body))
    }
}
