//! Replicate provider - Imagen 4 and Ideogram v3 predictions

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::ReplicateConfig;
use crate::error::{AppError, Result};
use crate::gallery::GallerySource;
use crate::provider::schema::{PollSchema, ResultExtractor};
use crate::provider::traits::{
    Destination, GenerationJob, MediaProvider, PollPolicy, PollResult, ProviderKind,
    ProviderRequest, ResultRef, Submission, TaskHandle,
};
use crate::provider::transport;

pub const IMAGEN_MODEL: &str = "google/imagen-4";
pub const IDEOGRAM_MODEL: &str = "ideogram-ai/ideogram-v3-turbo";

const IMAGEN_QUALITY_BOOSTER: &str = ", stunning quality, highly detailed, 8k resolution, \
sharp focus, professional image, cinematic lighting";
const IDEOGRAM_QUALITY_BOOSTER: &str = ", high quality, aesthetic, masterpiece, professional design";

const DEFAULT_ASPECT_RATIO: &str = "16:9";
const SAFETY_FILTER_LEVEL: &str = "block_medium_and_above";
const GALLERY_LABEL: &str = "replicate";

const STATUS_SCHEMA: PollSchema = PollSchema {
    status_pointer: "/status",
    done: &["succeeded"],
    failed: &["failed", "canceled"],
    reason_pointers: &["/error"],
    extractors: &[ResultExtractor::UrlOrFirst("/output")],
};

pub struct ReplicateProvider {
    client: Client,
    config: ReplicateConfig,
}

impl ReplicateProvider {
    pub fn new(client: Client, config: ReplicateConfig) -> Self {
        Self { client, config }
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn headers(&self) -> Result<HeaderMap> {
        if !self.is_configured() {
            return Err(AppError::ProviderNotConfigured(
                "Replicate API token is not set".to_string(),
            ));
        }
        transport::bearer(&self.config.api_token)
    }

    fn input(&self, job: &GenerationJob, model: &str) -> Map<String, Value> {
        let params = &job.parameters;
        let aspect_ratio = params
            .aspect_ratio
            .as_deref()
            .unwrap_or(DEFAULT_ASPECT_RATIO);

        let mut input = Map::new();
        match model {
            IMAGEN_MODEL => {
                input.insert(
                    "prompt".into(),
                    json!(format!("{}{}", job.prompt, IMAGEN_QUALITY_BOOSTER)),
                );
                input.insert("aspect_ratio".into(), json!(aspect_ratio));
                input.insert("safety_filter_level".into(), json!(SAFETY_FILTER_LEVEL));
            }
            IDEOGRAM_MODEL => {
                input.insert(
                    "prompt".into(),
                    json!(format!("{}{}", job.prompt, IDEOGRAM_QUALITY_BOOSTER)),
                );
                input.insert("aspect_ratio".into(), json!(aspect_ratio));
                input.insert(
                    "style_type".into(),
                    json!(params.style_type.as_deref().unwrap_or("None")),
                );
                input.insert(
                    "magic_prompt_option".into(),
                    json!(params.magic_prompt_option.as_deref().unwrap_or("Auto")),
                );
                input.insert("resolution".into(), json!("None"));
            }
            _ => {
                input.insert("prompt".into(), json!(job.prompt));
                if let Some(ratio) = params.aspect_ratio.as_deref() {
                    input.insert("aspect_ratio".into(), json!(ratio));
                }
            }
        }
        input
    }
}

#[async_trait]
impl MediaProvider for ReplicateProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Replicate
    }

    fn is_configured(&self) -> bool {
        !self.config.api_token.is_empty()
    }

    fn poll_policy(&self) -> PollPolicy {
        PollPolicy::from(&self.config.poll)
    }

    fn destination(&self, _job: &GenerationJob) -> Destination {
        Destination::new(GallerySource::Omnigen, GALLERY_LABEL)
    }

    fn build_payload(&self, job: &GenerationJob) -> Result<ProviderRequest> {
        let model = job.model.as_deref().unwrap_or(IMAGEN_MODEL);
        let (owner, name) = model
            .split_once('/')
            .filter(|(owner, name)| !owner.is_empty() && !name.is_empty())
            .ok_or_else(|| {
                AppError::InvalidRequest(format!(
                    "Replicate model must be 'owner/name', got '{}'",
                    model
                ))
            })?;

        let url = format!(
            "{}/v1/models/{}/{}/predictions",
            self.base_url(),
            owner,
            name
        );
        Ok(ProviderRequest::post(
            url,
            json!({ "input": self.input(job, model) }),
        ))
    }

    async fn submit(&self, job: &GenerationJob) -> Result<Submission> {
        let request = self.build_payload(job)?;
        let mut headers = self.headers()?;
        // let Replicate hold the connection briefly and answer inline when fast
        headers.insert("prefer", HeaderValue::from_static("wait"));

        let body = transport::submit_request(
            &self.client,
            self.kind(),
            &request,
            headers,
            self.config.poll.submit_timeout(),
        )
        .await?;

        match STATUS_SCHEMA.interpret(&body) {
            PollResult::Succeeded { result_url } => {
                info!(model = ?job.model, "Replicate prediction finished inline");
                return Ok(Submission::Completed(ResultRef::new(result_url)));
            }
            PollResult::Failed { reason } => {
                return Err(AppError::submission(self.kind().as_str(), reason));
            }
            PollResult::Pending => {}
        }

        let task_id = body
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::submission(self.kind().as_str(), "no prediction id in response"))?;

        let poll_url = body
            .pointer("/urls/get")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}/v1/predictions/{}", self.base_url(), task_id));

        debug!(task_id = %task_id, "Replicate prediction accepted");
        Ok(Submission::Task(TaskHandle::new(self.kind(), task_id, poll_url)))
    }

    async fn poll(&self, task: &TaskHandle, timeout: Duration) -> Result<PollResult> {
        let request = ProviderRequest::get(task.poll_url.clone());
        let body =
            transport::query_status(&self.client, self.kind(), &request, self.headers()?, timeout)
                .await?;

        Ok(STATUS_SCHEMA.interpret(&body))
    }
}
