//! Retry policy shared by every network caller that retries

use std::time::Duration;

use crate::config::RetryConfig;

/// Linear backoff: the delay before retry `n` (0-based) is `base * (n + 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn linear(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay to wait after failed attempt `attempt`, or `None` once retries are spent.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_retries {
            return None;
        }
        Some(self.base_delay * (attempt + 1))
    }

    /// Total time spent sleeping if every attempt is rejected
    pub fn total_backoff(&self) -> Duration {
        (0..self.max_retries)
            .filter_map(|attempt| self.delay_for(attempt))
            .sum()
    }

    /// Requests issued before giving up
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::linear(
            config.max_retries,
            Duration::from_millis(config.base_delay_ms),
        )
    }
}
