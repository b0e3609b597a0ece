//! API route definitions

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::handlers;
use crate::AppState;

/// Uploads are whole images held in memory
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    let generation = Router::new()
        .route("/api/generate", post(handlers::generate))
        .route("/api/generate/apiframe", post(handlers::generate_apiframe))
        .route(
            "/api/generate/pollinations",
            post(handlers::generate_pollinations),
        )
        .route(
            "/api/generate/pollinations/img2img",
            post(handlers::generate_pollinations_img2img),
        )
        .route(
            "/api/generate/pollinations/video",
            post(handlers::generate_pollinations_video),
        )
        .route(
            "/api/generate/pollinations/text",
            post(handlers::optimize_prompt),
        )
        .route("/api/pollinations/models", get(handlers::pollinations_models))
        .route(
            "/api/generate/kling/video",
            post(handlers::generate_kling_video),
        )
        .route(
            "/api/generate/kling/multi-image",
            post(handlers::generate_kling_multi_image),
        )
        .route("/api/kling/status", get(handlers::kling_status))
        .route("/api/generate/imagen", post(handlers::generate_imagen))
        .route("/api/generate/ideogram", post(handlers::generate_ideogram));

    let gallery = Router::new()
        .route("/api/gallery/:source", get(handlers::gallery))
        .route(
            "/api/gallery/refresh/:source",
            post(handlers::refresh_gallery),
        );

    let upload = Router::new()
        .route("/api/upload", post(handlers::upload))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES));

    Router::new()
        .route("/health", get(handlers::health_check))
        .merge(generation)
        .merge(gallery)
        .merge(upload)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
