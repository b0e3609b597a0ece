//! Functional tests for the media relay

use async_trait::async_trait;
use genmedia_gateway::config::{RelayConfig, RetryConfig};
use genmedia_gateway::media::MediaKind;
use genmedia_gateway::relay::MediaRelay;
use genmedia_gateway::storage::{DisabledStore, MemoryStore, ObjectMeta, ObjectStore};
use genmedia_gateway::Result;
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const BASE: &str = "https://cdn.test/file/bucket";

fn png_bytes() -> Vec<u8> {
    let mut data = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    data.extend_from_slice(&[0u8; 32]);
    data
}

fn fast_relay_config() -> RelayConfig {
    RelayConfig {
        image_download_timeout_secs: 5,
        video_download_timeout_secs: 5,
        image_upload_timeout_secs: 1,
        video_upload_timeout_secs: 1,
        image_retry: RetryConfig {
            max_retries: 3,
            base_delay_ms: 10,
        },
        video_retry: RetryConfig {
            max_retries: 3,
            base_delay_ms: 10,
        },
    }
}

fn relay_with(store: Arc<dyn ObjectStore>) -> MediaRelay {
    MediaRelay::new(reqwest::Client::new(), store, 2, &fast_relay_config())
}

/// Store whose puts take longer than the relay is willing to wait
struct SlowStore {
    inner: MemoryStore,
    delay: Duration,
}

#[async_trait]
impl ObjectStore for SlowStore {
    fn name(&self) -> &str {
        "slow"
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn public_url(&self, key: &str) -> String {
        self.inner.public_url(key)
    }

    async fn put(&self, data: Vec<u8>, key: &str, content_type: &str) -> Result<String> {
        tokio::time::sleep(self.delay).await;
        self.inner.put(data, key, content_type).await
    }

    async fn list(&self, prefix: &str, max_keys: i32) -> Result<Vec<ObjectMeta>> {
        self.inner.list(prefix, max_keys).await
    }
}

#[tokio::test]
async fn test_relay_stores_media_under_folder() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/result.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes()))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new(BASE));
    let relay = relay_with(store.clone());

    let stored = relay
        .relay(
            &format!("{}/result.png", server.uri()),
            "omniGen",
            MediaKind::Image,
            &HeaderMap::new(),
        )
        .await
        .expect("relay should succeed");

    assert!(stored.key.starts_with("omniGen/"));
    assert!(stored.key.ends_with(".png"));
    assert_eq!(stored.durable_url, format!("{}/{}", BASE, stored.key));

    let blob = store.get(&stored.key).unwrap();
    assert_eq!(blob.data, png_bytes());
    assert_eq!(blob.content_type, "image/png");
}

#[tokio::test]
async fn test_download_headers_are_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/private.png"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes()))
        .expect(1)
        .mount(&server)
        .await;

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer secret"));

    let relay = relay_with(Arc::new(MemoryStore::new(BASE)));
    let stored = relay
        .relay(
            &format!("{}/private.png", server.uri()),
            "omniGen",
            MediaKind::Image,
            &headers,
        )
        .await;
    assert!(stored.is_some());
}

#[tokio::test]
async fn test_rate_limited_download_gives_up_after_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/busy.png"))
        .respond_with(ResponseTemplate::new(429))
        .expect(4)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new(BASE));
    let relay = relay_with(store.clone());

    let stored = relay
        .relay(
            &format!("{}/busy.png", server.uri()),
            "omniGen",
            MediaKind::Image,
            &HeaderMap::new(),
        )
        .await;

    assert!(stored.is_none());
    assert!(store.is_empty());
}

/// Answers 429 and records when each request arrived
#[derive(Clone, Default)]
struct RateLimited {
    arrivals: Arc<Mutex<Vec<Instant>>>,
}

impl Respond for RateLimited {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.arrivals.lock().push(Instant::now());
        ResponseTemplate::new(429)
    }
}

#[tokio::test]
async fn test_rate_limit_backoff_is_linear_between_requests() {
    let server = MockServer::start().await;
    let responder = RateLimited::default();
    Mock::given(method("GET"))
        .and(path("/throttled.png"))
        .respond_with(responder.clone())
        .expect(4)
        .mount(&server)
        .await;

    let base = Duration::from_millis(200);
    let config = RelayConfig {
        image_retry: RetryConfig {
            max_retries: 3,
            base_delay_ms: 200,
        },
        ..fast_relay_config()
    };
    let relay = MediaRelay::new(
        reqwest::Client::new(),
        Arc::new(MemoryStore::new(BASE)),
        2,
        &config,
    );

    let started = Instant::now();
    let stored = relay
        .relay(
            &format!("{}/throttled.png", server.uri()),
            "omniGen",
            MediaKind::Image,
            &HeaderMap::new(),
        )
        .await;
    assert!(stored.is_none());
    assert!(started.elapsed() >= base * 6);

    // each retry waits base * (n + 1) after the previous rejection
    let arrivals = responder.arrivals.lock().clone();
    assert_eq!(arrivals.len(), 4);
    for (n, pair) in arrivals.windows(2).enumerate() {
        let gap = pair[1] - pair[0];
        assert!(
            gap >= base * (n as u32 + 1),
            "retry {} came after {:?}",
            n + 1,
            gap
        );
    }
}

#[test]
fn test_default_image_schedule_is_three_six_nine_seconds() {
    let relay = MediaRelay::new(
        reqwest::Client::new(),
        Arc::new(MemoryStore::new(BASE)),
        5,
        &RelayConfig::default(),
    );

    let retry = &relay.limits(MediaKind::Image).retry;
    let delays: Vec<_> = (0..retry.max_retries)
        .filter_map(|attempt| retry.delay_for(attempt))
        .collect();
    assert_eq!(
        delays,
        vec![
            Duration::from_secs(3),
            Duration::from_secs(6),
            Duration::from_secs(9)
        ]
    );
    assert_eq!(retry.total_backoff(), Duration::from_secs(18));
    assert_eq!(retry.max_attempts(), 4);
    assert_eq!(
        relay.limits(MediaKind::Video).retry.total_backoff(),
        Duration::from_secs(30)
    );
}

#[tokio::test]
async fn test_rate_limit_then_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/video.mp4"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/video.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 64]))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new(BASE));
    let relay = relay_with(store.clone());

    let stored = relay
        .relay(
            &format!("{}/video.mp4", server.uri()),
            "kling_video",
            MediaKind::Video,
            &HeaderMap::new(),
        )
        .await
        .expect("third attempt should succeed");

    // unknown magic bytes fall back to the kind's default extension
    assert!(stored.key.starts_with("kling_video/"));
    assert!(stored.key.ends_with(".mp4"));
    assert_eq!(store.get(&stored.key).unwrap().content_type, "video/mp4");
}

#[tokio::test]
async fn test_other_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone.png"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let relay = relay_with(Arc::new(MemoryStore::new(BASE)));
    let stored = relay
        .relay(
            &format!("{}/gone.png", server.uri()),
            "omniGen",
            MediaKind::Image,
            &HeaderMap::new(),
        )
        .await;
    assert!(stored.is_none());
}

#[tokio::test]
async fn test_same_source_twice_gives_distinct_keys() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/same.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes()))
        .expect(2)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new(BASE));
    let relay = relay_with(store.clone());
    let url = format!("{}/same.png", server.uri());

    let first = relay
        .relay(&url, "omniGen", MediaKind::Image, &HeaderMap::new())
        .await
        .unwrap();
    let second = relay
        .relay(&url, "omniGen", MediaKind::Image, &HeaderMap::new())
        .await
        .unwrap();

    assert_ne!(first.key, second.key);
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn test_disabled_store_skips_download() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes()))
        .expect(0)
        .mount(&server)
        .await;

    let relay = relay_with(Arc::new(DisabledStore::new(BASE)));
    let stored = relay
        .relay(
            &format!("{}/result.png", server.uri()),
            "omniGen",
            MediaKind::Image,
            &HeaderMap::new(),
        )
        .await;
    assert!(stored.is_none());
}

#[tokio::test]
async fn test_upload_timeout_abandons_wait_but_put_still_lands() {
    let store = Arc::new(SlowStore {
        inner: MemoryStore::new(BASE),
        delay: Duration::from_millis(1_500),
    });
    let relay = relay_with(store.clone());

    let result = relay
        .store_bytes(png_bytes(), "omniGen", MediaKind::Image)
        .await;
    assert!(result.is_err());
    assert!(store.inner.is_empty());

    tokio::time::sleep(Duration::from_millis(1_000)).await;
    assert_eq!(store.inner.len(), 1);
    assert!(store.inner.keys()[0].starts_with("omniGen/"));
}

#[tokio::test]
async fn test_store_bytes_rejects_empty_payload() {
    let store = Arc::new(MemoryStore::new(BASE));
    let relay = relay_with(store.clone());

    assert!(relay
        .store_bytes(Vec::new(), "omniGen", MediaKind::Image)
        .await
        .is_err());
    assert!(store.is_empty());
}
