//! HTTP API tests driven through the router

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use genmedia_gateway::config::{KlingConfig, PollConfig, Settings};
use genmedia_gateway::storage::{MemoryStore, ObjectStore};
use genmedia_gateway::{api, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BASE: &str = "https://cdn.test/file/bucket";

fn app_with(settings: Settings, store: Arc<dyn ObjectStore>) -> Router {
    let state = AppState::with_store(settings, store).unwrap();
    api::create_router(Arc::new(state))
}

fn app() -> Router {
    app_with(Settings::default(), Arc::new(MemoryStore::new(BASE)))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn multipart(uri: &str, field: &str, data: &[u8]) -> Request<Body> {
    let boundary = "gallery-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"photo.png\"\r\n",
            field
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

fn png_bytes() -> Vec<u8> {
    let mut data = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    data.extend_from_slice(&[0u8; 32]);
    data
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(app(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage_enabled"], true);
}

#[tokio::test]
async fn test_unknown_gallery_is_bad_request() {
    let (status, body) = send(app(), get("/api/gallery/midjourney")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "invalid_request_error");
}

#[tokio::test]
async fn test_gallery_lists_stored_objects() {
    let store = Arc::new(MemoryStore::new(BASE));
    store
        .put(png_bytes(), "omniGen/1700000000_abcdef.png", "image/png")
        .await
        .unwrap();

    let (status, body) = send(
        app_with(Settings::default(), store),
        get("/api/gallery/pollinations"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["key"], "omniGen/1700000000_abcdef.png");
    assert_eq!(
        entries[0]["b2_url"],
        format!("{}/omniGen/1700000000_abcdef.png", BASE)
    );
    assert_eq!(entries[0]["type"], "image");
}

#[tokio::test]
async fn test_refresh_reports_count() {
    let store = Arc::new(MemoryStore::new(BASE));
    for key in ["kling_video/1_aaaaaa.mp4", "kling_video/2_bbbbbb.mp4"] {
        store.put(vec![1, 2, 3], key, "video/mp4").await.unwrap();
    }

    let (status, body) = send(
        app_with(Settings::default(), store),
        Request::builder()
            .method("POST")
            .uri("/api/gallery/refresh/kling")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "refreshed", "target": "kling", "count": 2}));
}

#[tokio::test]
async fn test_kling_status_without_keys() {
    let (status, body) = send(app(), get("/api/kling/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"configured": false, "has_access_key": false, "has_secret_key": false})
    );
}

#[tokio::test]
async fn test_pollinations_models() {
    let (status, body) = send(app(), get("/api/pollinations/models")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["text2img"]
        .as_array()
        .unwrap()
        .iter()
        .any(|m| m == "flux"));
}

#[tokio::test]
async fn test_unconfigured_provider_is_bad_request() {
    let (status, body) = send(
        app(),
        post_json(
            "/api/generate/apiframe",
            json!({"prompt": "a lighthouse", "model": "flux"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "provider_not_configured");
}

#[tokio::test]
async fn test_apiframe_rejects_foreign_model() {
    let (status, _) = send(
        app(),
        post_json(
            "/api/generate/apiframe",
            json!({"prompt": "a lighthouse", "model": "kling"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_kling_multi_image_rejects_too_many_images() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut settings = Settings::default();
    settings.providers.kling = KlingConfig {
        access_key: "ak".to_string(),
        secret_key: "sk".to_string(),
        base_url: server.uri(),
        ..KlingConfig::default()
    };

    let images: Vec<String> = (0..5).map(|i| format!("https://img.test/{}.png", i)).collect();
    let (status, body) = send(
        app_with(settings, Arc::new(MemoryStore::new(BASE))),
        post_json(
            "/api/generate/kling/multi-image",
            json!({"prompt": "a parade", "image_urls": images}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("1-4 images"));
}

#[tokio::test]
async fn test_kling_video_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/videos/image2video"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {"task_id": "kv-1"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/videos/image2video/kv-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {
                "task_status": "succeed",
                "task_result": {"videos": [{"url": format!("{}/clip.mp4", server.uri())}]}
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/clip.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![5u8; 48]))
        .mount(&server)
        .await;

    let mut settings = Settings::default();
    settings.providers.kling = KlingConfig {
        access_key: "ak".to_string(),
        secret_key: "sk".to_string(),
        base_url: server.uri(),
        poll: PollConfig {
            submit_timeout_secs: 5,
            poll_interval_ms: 10,
            max_poll_attempts: 3,
            poll_timeout_secs: 5,
        },
    };

    let (status, body) = send(
        app_with(settings, Arc::new(MemoryStore::new(BASE))),
        post_json(
            "/api/generate/kling/video",
            json!({
                "prompt": "the statue turns its head",
                "image_url": "https://img.test/statue.png",
                "duration": "10"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["url"], format!("{}/clip.mp4", server.uri()));
    assert!(body["b2_url"]
        .as_str()
        .unwrap()
        .starts_with(&format!("{}/kling_video/", BASE)));
    assert_eq!(body["task_id"], "kv-1");
    assert_eq!(body["type"], "video");
    assert_eq!(body["source"], "kling");
}

#[tokio::test]
async fn test_upload_stores_file() {
    let (status, body) = send(app(), multipart("/api/upload", "file", &png_bytes())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "upload");
    assert!(body["b2_url"]
        .as_str()
        .unwrap()
        .starts_with(&format!("{}/omniGen/", BASE)));
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let (status, _) = send(app(), multipart("/api/upload", "attachment", &png_bytes())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
