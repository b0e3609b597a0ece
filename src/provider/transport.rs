//! Shared request plumbing for provider calls

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::provider::traits::{ProviderKind, ProviderRequest};

const MAX_ERROR_BODY: usize = 500;

/// Send a submission. Any failure, including an unparsable body, is a
/// [`AppError::SubmissionFailed`].
pub async fn submit_request(
    client: &Client,
    provider: ProviderKind,
    request: &ProviderRequest,
    headers: HeaderMap,
    timeout: Duration,
) -> Result<Value> {
    debug!(provider = %provider, url = %request.url, "Submitting generation request");

    let (status, text) = send(client, request, headers, timeout)
        .await
        .map_err(|e| AppError::submission(provider.as_str(), e.to_string()))?;

    if !status.is_success() {
        return Err(AppError::submission(
            provider.as_str(),
            format!("HTTP {}: {}", status.as_u16(), truncate(&text)),
        ));
    }

    serde_json::from_str(&text).map_err(|e| {
        AppError::submission(provider.as_str(), format!("invalid response body: {}", e))
    })
}

/// Send one status query. Every failure is a [`AppError::PollTransient`].
pub async fn query_status(
    client: &Client,
    provider: ProviderKind,
    request: &ProviderRequest,
    headers: HeaderMap,
    timeout: Duration,
) -> Result<Value> {
    let (status, text) = send(client, request, headers, timeout)
        .await
        .map_err(|e| AppError::PollTransient(format!("{}: {}", provider, e)))?;

    if !status.is_success() {
        return Err(AppError::PollTransient(format!(
            "{}: HTTP {}: {}",
            provider,
            status.as_u16(),
            truncate(&text)
        )));
    }

    if text.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&text)
        .map_err(|e| AppError::PollTransient(format!("{}: invalid status body: {}", provider, e)))
}

async fn send(
    client: &Client,
    request: &ProviderRequest,
    headers: HeaderMap,
    timeout: Duration,
) -> std::result::Result<(reqwest::StatusCode, String), reqwest::Error> {
    let mut builder = client
        .request(request.method.clone(), &request.url)
        .headers(headers)
        .timeout(timeout);

    if let Some(body) = &request.body {
        builder = builder.json(body);
    }

    let response = builder.send().await?;
    let status = response.status();
    let text = response.text().await?;
    Ok((status, text))
}

/// `Authorization: <value>` header map
pub fn authorization(value: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let value = HeaderValue::from_str(value)
        .map_err(|_| AppError::Internal("credential is not a valid header value".to_string()))?;
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}

pub fn bearer(token: &str) -> Result<HeaderMap> {
    authorization(&format!("Bearer {}", token))
}

fn truncate(text: &str) -> &str {
    match text.char_indices().nth(MAX_ERROR_BODY) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
