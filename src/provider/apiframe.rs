//! APIFrame provider - Ideogram, Flux and Nano Banana image models

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::ApiframeConfig;
use crate::error::{AppError, Result};
use crate::gallery::GallerySource;
use crate::provider::schema::{extract_result_url, PollSchema, ResultExtractor};
use crate::provider::traits::{
    Destination, GenerationJob, MediaProvider, PollPolicy, PollResult, ProviderKind,
    ProviderRequest, ResultRef, Submission, TaskHandle,
};
use crate::provider::transport;

const FETCH_PATH: &str = "/fetch";
const GALLERY_LABEL: &str = "apiFrame";

const STATUS_SCHEMA: PollSchema = PollSchema {
    status_pointer: "/status",
    done: &["finished", "completed", "succeeded"],
    failed: &["failed"],
    reason_pointers: &["/error", "/message"],
    extractors: &[
        ResultExtractor::FirstUrl("/image_urls"),
        ResultExtractor::Url("/image_url"),
        ResultExtractor::UrlOrFirst("/output"),
    ],
};

/// Nano Banana answers synchronously with the image list
const SYNC_EXTRACTORS: &[ResultExtractor] = &[ResultExtractor::FirstUrl("/image_urls")];

/// One APIFrame model. All three share the key, base URL and fetch endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiframeModel {
    Ideogram,
    Flux,
    NanoBanana,
}

impl ApiframeModel {
    fn kind(&self) -> ProviderKind {
        match self {
            ApiframeModel::Ideogram => ProviderKind::Ideogram,
            ApiframeModel::Flux => ProviderKind::Flux,
            ApiframeModel::NanoBanana => ProviderKind::NanoBanana,
        }
    }

    fn path(&self) -> &'static str {
        match self {
            ApiframeModel::Ideogram => "/ideogram-imagine",
            ApiframeModel::Flux => "/flux-imagine",
            ApiframeModel::NanoBanana => "/nano-banana",
        }
    }

    fn is_synchronous(&self) -> bool {
        matches!(self, ApiframeModel::NanoBanana)
    }
}

/// Ideogram wants `ASPECT_16_9` style names
fn ideogram_aspect(aspect_ratio: Option<&str>) -> String {
    match aspect_ratio {
        Some(ratio) if ratio.starts_with("ASPECT_") => ratio.to_string(),
        Some(ratio) if ratio.contains(':') => format!("ASPECT_{}", ratio.replace(':', "_")),
        _ => "ASPECT_1_1".to_string(),
    }
}

pub struct ApiframeProvider {
    client: Client,
    model: ApiframeModel,
    config: ApiframeConfig,
}

impl ApiframeProvider {
    pub fn new(client: Client, model: ApiframeModel, config: ApiframeConfig) -> Self {
        Self {
            client,
            model,
            config,
        }
    }

    pub fn model(&self) -> ApiframeModel {
        self.model
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn headers(&self) -> Result<HeaderMap> {
        if !self.is_configured() {
            return Err(AppError::ProviderNotConfigured(
                "APIFrame API key is not set".to_string(),
            ));
        }
        transport::authorization(&self.config.api_key)
    }
}

#[async_trait]
impl MediaProvider for ApiframeProvider {
    fn kind(&self) -> ProviderKind {
        self.model.kind()
    }

    fn is_configured(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    fn poll_policy(&self) -> PollPolicy {
        PollPolicy::from(&self.config.poll)
    }

    fn destination(&self, _job: &GenerationJob) -> Destination {
        Destination::new(GallerySource::Apiframe, GALLERY_LABEL)
    }

    fn build_payload(&self, job: &GenerationJob) -> Result<ProviderRequest> {
        let url = format!("{}{}", self.base_url(), self.model.path());

        let body = match self.model {
            ApiframeModel::Flux => json!({
                "prompt": job.prompt,
                "model": "flux-pro",
            }),
            ApiframeModel::NanoBanana => json!({
                "prompt": job.prompt,
                "images": job.source_images,
                "aspect_ratio": "match_input_image",
            }),
            ApiframeModel::Ideogram => json!({
                "prompt": job.prompt,
                "aspect_ratio": ideogram_aspect(job.parameters.aspect_ratio.as_deref()),
            }),
        };

        Ok(ProviderRequest::post(url, body))
    }

    async fn submit(&self, job: &GenerationJob) -> Result<Submission> {
        let headers = self.headers()?;
        let request = self.build_payload(job)?;
        let kind = self.kind();

        let body = transport::submit_request(
            &self.client,
            kind,
            &request,
            headers,
            self.config.poll.submit_timeout(),
        )
        .await?;

        if self.model.is_synchronous() {
            let url = extract_result_url(&body, SYNC_EXTRACTORS).ok_or_else(|| {
                AppError::submission(kind.as_str(), format!("No images returned from {}", kind))
            })?;
            info!(provider = %kind, "Synchronous generation completed");
            return Ok(Submission::Completed(ResultRef::new(url)));
        }

        match body.get("task_id").and_then(Value::as_str) {
            Some(task_id) if !task_id.is_empty() => {
                debug!(provider = %kind, task_id = %task_id, "Task accepted");
                let poll_url = format!("{}{}", self.base_url(), FETCH_PATH);
                Ok(Submission::Task(TaskHandle::new(kind, task_id, poll_url)))
            }
            _ => {
                let detail = body
                    .get("errors")
                    .or_else(|| body.get("error"))
                    .map(Value::to_string)
                    .unwrap_or_else(|| body.to_string());
                Err(AppError::submission(
                    kind.as_str(),
                    format!("no task_id in response: {}", detail),
                ))
            }
        }
    }

    async fn poll(&self, task: &TaskHandle, timeout: Duration) -> Result<PollResult> {
        let request = ProviderRequest::post(task.poll_url.clone(), json!({ "task_id": task.task_id }));
        let body =
            transport::query_status(&self.client, self.kind(), &request, self.headers()?, timeout)
                .await?;

        Ok(STATUS_SCHEMA.interpret(&body))
    }
}
