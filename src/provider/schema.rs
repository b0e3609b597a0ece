//! Declarative status and result-URL extraction for provider responses
//!
//! Provider status bodies differ only in where the status, failure reason
//! and result URL live. Each provider describes those locations with JSON
//! pointers and [`PollSchema::interpret`] does the rest.

use serde_json::Value;

use crate::provider::traits::PollResult;

const UNKNOWN_ERROR: &str = "Unknown error";

/// One place a result URL may live, tried in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultExtractor {
    /// A string at the pointer
    Url(&'static str),
    /// The first string of an array at the pointer
    FirstUrl(&'static str),
    /// Either a string or the first string of an array at the pointer
    UrlOrFirst(&'static str),
}

impl ResultExtractor {
    fn extract(&self, body: &Value) -> Option<String> {
        let found = match self {
            ResultExtractor::Url(pointer) => body.pointer(pointer).and_then(Value::as_str),
            ResultExtractor::FirstUrl(pointer) => body
                .pointer(pointer)
                .and_then(Value::as_array)
                .and_then(|items| items.first())
                .and_then(Value::as_str),
            ResultExtractor::UrlOrFirst(pointer) => match body.pointer(pointer) {
                Some(Value::String(url)) => Some(url.as_str()),
                Some(Value::Array(items)) => items.first().and_then(Value::as_str),
                _ => None,
            },
        };

        found
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
    }
}

/// First non-empty URL produced by `extractors`, in order
pub fn extract_result_url(body: &Value, extractors: &[ResultExtractor]) -> Option<String> {
    extractors.iter().find_map(|extractor| extractor.extract(body))
}

/// Where a provider's status body keeps its state
#[derive(Debug, Clone, Copy)]
pub struct PollSchema {
    pub status_pointer: &'static str,
    /// Status values meaning the result is ready (case-insensitive)
    pub done: &'static [&'static str],
    /// Status values meaning the provider gave up (case-insensitive)
    pub failed: &'static [&'static str],
    /// Failure reason locations, first present wins
    pub reason_pointers: &'static [&'static str],
    pub extractors: &'static [ResultExtractor],
}

impl PollSchema {
    pub fn status<'a>(&self, body: &'a Value) -> Option<&'a str> {
        body.pointer(self.status_pointer).and_then(Value::as_str)
    }

    /// Classify one status body. A done status without any result URL is
    /// still pending: some providers flip the status before the output is
    /// attached.
    pub fn interpret(&self, body: &Value) -> PollResult {
        let Some(status) = self.status(body) else {
            return PollResult::Pending;
        };

        if matches_any(status, self.failed) {
            return PollResult::Failed {
                reason: self.failure_reason(body),
            };
        }

        if matches_any(status, self.done) {
            if let Some(result_url) = self.extract(body) {
                return PollResult::Succeeded { result_url };
            }
        }

        PollResult::Pending
    }

    pub fn extract(&self, body: &Value) -> Option<String> {
        extract_result_url(body, self.extractors)
    }

    fn failure_reason(&self, body: &Value) -> String {
        self.reason_pointers
            .iter()
            .filter_map(|pointer| body.pointer(pointer))
            .find_map(|value| match value {
                Value::Null => None,
                Value::String(text) if text.trim().is_empty() => None,
                Value::String(text) => Some(text.clone()),
                Value::Object(map) => map
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .or_else(|| Some(value.to_string())),
                other => Some(other.to_string()),
            })
            .unwrap_or_else(|| UNKNOWN_ERROR.to_string())
    }
}

fn matches_any(status: &str, candidates: &[&str]) -> bool {
    candidates
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(status))
}
