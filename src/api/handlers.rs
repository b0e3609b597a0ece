//! API request handlers

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::api::schemas::{
    ApiframeRequest, HealthResponse, IdeogramRequest, ImagenRequest, KlingMultiImageRequest,
    KlingStatus, KlingVideoRequest, OptimizedPrompt, PollinationsImg2ImgRequest,
    PollinationsRequest, PollinationsTextRequest, PollinationsVideoRequest, RefreshResponse,
};
use crate::error::{AppError, Result};
use crate::gallery::{CatalogEntry, GallerySource};
use crate::gateway::GenerationOutcome;
use crate::provider::pollinations::ModelCatalog;
use crate::provider::GenerationJob;
use crate::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage_enabled: state.relay.store().is_enabled(),
    })
}

/// Generic generation endpoint taking a full job
pub async fn generate(
    State(state): State<Arc<AppState>>,
    Json(job): Json<GenerationJob>,
) -> Result<Json<GenerationOutcome>> {
    run_job(&state, job).await
}

pub async fn generate_apiframe(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ApiframeRequest>,
) -> Result<Json<GenerationOutcome>> {
    run_job(&state, request.into_job()?).await
}

pub async fn generate_pollinations(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PollinationsRequest>,
) -> Result<Json<GenerationOutcome>> {
    run_job(&state, request.into_job()).await
}

pub async fn generate_pollinations_img2img(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PollinationsImg2ImgRequest>,
) -> Result<Json<GenerationOutcome>> {
    run_job(&state, request.into_job()).await
}

pub async fn generate_pollinations_video(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PollinationsVideoRequest>,
) -> Result<Json<GenerationOutcome>> {
    run_job(&state, request.into_job()?).await
}

/// Prompt optimizer
pub async fn optimize_prompt(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PollinationsTextRequest>,
) -> Result<Json<OptimizedPrompt>> {
    let optimized_prompt = state
        .providers
        .pollinations()
        .optimize_prompt(&request.prompt, request.model.as_deref())
        .await?;

    Ok(Json(OptimizedPrompt { optimized_prompt }))
}

pub async fn pollinations_models(State(state): State<Arc<AppState>>) -> Json<&'static ModelCatalog> {
    Json(state.providers.pollinations().models())
}

pub async fn generate_kling_video(
    State(state): State<Arc<AppState>>,
    Json(request): Json<KlingVideoRequest>,
) -> Result<Json<GenerationOutcome>> {
    run_job(&state, request.into_job()?).await
}

pub async fn generate_kling_multi_image(
    State(state): State<Arc<AppState>>,
    Json(request): Json<KlingMultiImageRequest>,
) -> Result<Json<GenerationOutcome>> {
    run_job(&state, request.into_job()?).await
}

pub async fn kling_status(State(state): State<Arc<AppState>>) -> Json<KlingStatus> {
    let kling = state.providers.kling();
    Json(KlingStatus {
        configured: kling.has_access_key() && kling.has_secret_key(),
        has_access_key: kling.has_access_key(),
        has_secret_key: kling.has_secret_key(),
    })
}

pub async fn generate_imagen(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ImagenRequest>,
) -> Result<Json<GenerationOutcome>> {
    run_job(&state, request.into_job()).await
}

pub async fn generate_ideogram(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IdeogramRequest>,
) -> Result<Json<GenerationOutcome>> {
    run_job(&state, request.into_job()).await
}

/// Direct upload of an image file into the omnigen gallery
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<GenerationOutcome>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidRequest(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidRequest(format!("Failed to read upload: {}", e)))?;

        debug!(filename = ?filename, size = data.len(), "Received upload");
        let outcome = state.generation.upload(data.to_vec()).await?;
        info!(url = %outcome.b2_url, "Stored upload");
        return Ok(Json(outcome));
    }

    Err(AppError::InvalidRequest(
        "multipart field 'file' is required".to_string(),
    ))
}

/// Catalog for one gallery
pub async fn gallery(
    State(state): State<Arc<AppState>>,
    Path(source): Path<String>,
) -> Result<Json<Vec<CatalogEntry>>> {
    let source: GallerySource = source.parse()?;
    Ok(Json(state.generation.list_catalog(source).await))
}

/// Relist one gallery from storage
pub async fn refresh_gallery(
    State(state): State<Arc<AppState>>,
    Path(source): Path<String>,
) -> Result<Json<RefreshResponse>> {
    let source: GallerySource = source.parse()?;
    let entries = state.generation.refresh_catalog(source).await?;

    Ok(Json(RefreshResponse {
        status: "refreshed".to_string(),
        target: source.as_str().to_string(),
        count: entries.len(),
    }))
}

async fn run_job(state: &AppState, job: GenerationJob) -> Result<Json<GenerationOutcome>> {
    info!(
        provider = %job.provider,
        model = ?job.model,
        media = job.media.as_str(),
        prompt_len = job.prompt.len(),
        "Generation requested"
    );
    let outcome = state.generation.generate(job).await?;
    Ok(Json(outcome))
}
