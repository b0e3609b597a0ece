//! Functional tests for provider submission and polling

use genmedia_gateway::config::{ApiframeConfig, KlingConfig, PollConfig};
use genmedia_gateway::gateway::poller;
use genmedia_gateway::provider::apiframe::{ApiframeModel, ApiframeProvider};
use genmedia_gateway::provider::kling::KlingProvider;
use genmedia_gateway::provider::{GenerationJob, ProviderKind};
use genmedia_gateway::AppError;
use serde_json::json;
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_poll(max_poll_attempts: u32) -> PollConfig {
    PollConfig {
        submit_timeout_secs: 5,
        poll_interval_ms: 10,
        max_poll_attempts,
        poll_timeout_secs: 5,
    }
}

fn kling(server: &MockServer, max_poll_attempts: u32) -> KlingProvider {
    KlingProvider::new(
        reqwest::Client::new(),
        KlingConfig {
            access_key: "ak".to_string(),
            secret_key: "sk".to_string(),
            base_url: server.uri(),
            poll: fast_poll(max_poll_attempts),
        },
    )
}

fn apiframe(server: &MockServer, model: ApiframeModel) -> ApiframeProvider {
    ApiframeProvider::new(
        reqwest::Client::new(),
        model,
        ApiframeConfig {
            api_key: "frame-key".to_string(),
            base_url: server.uri(),
            poll: fast_poll(5),
        },
    )
}

fn kling_job() -> GenerationJob {
    GenerationJob::new(ProviderKind::Kling, "ocean waves at dusk")
}

async fn mount_kling_submit(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/videos/text2video"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "message": "SUCCEED",
            "data": {"task_id": "task-123", "task_status": "submitted"}
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_submission_http_error_never_polls() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/videos/text2video"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = poller::run(&kling(&server, 5), &kling_job()).await.unwrap_err();
    match err {
        AppError::SubmissionFailed { provider, message } => {
            assert_eq!(provider, "kling");
            assert!(message.contains("500"));
            assert!(message.contains("upstream exploded"));
        }
        other => panic!("expected SubmissionFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_kling_error_code_is_a_submission_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/videos/text2video"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 1102,
            "message": "Account balance not enough"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = poller::run(&kling(&server, 5), &kling_job()).await.unwrap_err();
    assert!(
        matches!(err, AppError::SubmissionFailed { ref message, .. } if message.contains("balance")),
        "unexpected error: {:?}",
        err
    );
}

#[tokio::test]
async fn test_explicit_failure_is_not_a_timeout() {
    let server = MockServer::start().await;
    mount_kling_submit(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/videos/text2video/task-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {
                "task_id": "task-123",
                "task_status": "failed",
                "task_status_msg": "Content moderation rejected the prompt"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = poller::run(&kling(&server, 10), &kling_job()).await.unwrap_err();
    match err {
        AppError::GenerationFailed { message, .. } => {
            assert_eq!(message, "Content moderation rejected the prompt");
        }
        other => panic!("expected GenerationFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_never_terminal_times_out_after_exactly_max_attempts() {
    let server = MockServer::start().await;
    mount_kling_submit(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/videos/text2video/task-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {"task_id": "task-123", "task_status": "processing"}
        })))
        .expect(6)
        .mount(&server)
        .await;

    let err = poller::run(&kling(&server, 6), &kling_job()).await.unwrap_err();
    assert!(
        matches!(err, AppError::GenerationTimedOut { attempts: 6, .. }),
        "unexpected error: {:?}",
        err
    );
}

#[tokio::test]
async fn test_kling_pending_then_succeed() {
    let server = MockServer::start().await;
    mount_kling_submit(&server).await;

    Mock::given(method("GET"))
        .and(path("/v1/videos/text2video/task-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {"task_id": "task-123", "task_status": "processing"}
        })))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/videos/text2video/task-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {
                "task_id": "task-123",
                "task_status": "succeed",
                "task_result": {"videos": [{"id": "v1", "url": "https://kling.cdn.test/v1.mp4"}]}
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let completion = poller::run(&kling(&server, 10), &kling_job()).await.unwrap();
    assert_eq!(completion.result.url, "https://kling.cdn.test/v1.mp4");
    assert_eq!(completion.task_id.as_deref(), Some("task-123"));
    assert_eq!(completion.poll_attempts, 3);
}

#[tokio::test]
async fn test_apiframe_transient_errors_then_finished() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/flux-imagine"))
        .and(header("authorization", "frame-key"))
        .and(body_json(json!({"prompt": "a lighthouse", "model": "flux-pro"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"task_id": "af-1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/fetch"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/fetch"))
        .and(body_json(json!({"task_id": "af-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task_id": "af-1",
            "status": "finished",
            "image_urls": ["https://apiframe.cdn.test/a.png", "https://apiframe.cdn.test/b.png"]
        })))
        .mount(&server)
        .await;

    let job = GenerationJob::new(ProviderKind::Flux, "a lighthouse");
    let completion = poller::run(&apiframe(&server, ApiframeModel::Flux), &job)
        .await
        .unwrap();
    assert_eq!(completion.result.url, "https://apiframe.cdn.test/a.png");
    assert_eq!(completion.poll_attempts, 3);
}

#[tokio::test]
async fn test_nano_banana_is_synchronous() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/nano-banana"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "image_urls": ["https://apiframe.cdn.test/nb.png"]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/fetch"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let job = GenerationJob::new(ProviderKind::NanoBanana, "make the sky purple")
        .with_source_images(vec!["https://img.test/in.png".to_string()]);
    let completion = poller::run(&apiframe(&server, ApiframeModel::NanoBanana), &job)
        .await
        .unwrap();

    assert_eq!(completion.result.url, "https://apiframe.cdn.test/nb.png");
    assert!(completion.task_id.is_none());
    assert_eq!(completion.poll_attempts, 0);
}

#[tokio::test]
async fn test_unconfigured_provider_is_rejected_before_submission() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let provider = KlingProvider::new(
        reqwest::Client::new(),
        KlingConfig {
            base_url: server.uri(),
            ..KlingConfig::default()
        },
    );

    let err = poller::run(&provider, &kling_job()).await.unwrap_err();
    assert!(matches!(err, AppError::ProviderNotConfigured(_)));
}
