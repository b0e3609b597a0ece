//! Media download with retry on rate limiting

use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::retry::RetryPolicy;

/// Fetches remote media fully into memory
#[derive(Clone)]
pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Download `url`. HTTP 429 is retried according to `retry`; any other
    /// non-success status or transport error fails immediately.
    pub async fn fetch(
        &self,
        url: &str,
        headers: &HeaderMap,
        timeout: Duration,
        retry: &RetryPolicy,
    ) -> Result<Vec<u8>> {
        let mut attempt = 0;

        loop {
            let response = self
                .client
                .get(url)
                .headers(headers.clone())
                .timeout(timeout)
                .send()
                .await?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                match retry.delay_for(attempt) {
                    Some(delay) => {
                        warn!(
                            url = %url,
                            attempt = attempt + 1,
                            max_retries = retry.max_retries,
                            delay_ms = delay.as_millis() as u64,
                            "Download rate limited, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    None => {
                        return Err(AppError::RelayFailed(format!(
                            "rate limited after {} attempts",
                            attempt + 1
                        )));
                    }
                }
            }

            if !status.is_success() {
                return Err(AppError::RelayFailed(format!(
                    "download returned {}",
                    status
                )));
            }

            let bytes = response.bytes().await?;
            if bytes.is_empty() {
                return Err(AppError::RelayFailed("download returned no data".to_string()));
            }

            debug!(url = %url, size = bytes.len(), "Downloaded media");
            return Ok(bytes.to_vec());
        }
    }
}
