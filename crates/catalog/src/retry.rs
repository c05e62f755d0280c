use std::time::Duration;

use rand::Rng;

use crate::{config::RetryConfig, error::CatalogError};

/// Decides whether a failed catalog request is retried and how long to wait.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter: bool,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self { max_retries, base_delay, max_delay: max_delay.max(base_delay), jitter: true }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.initial_backoff_ms),
            Duration::from_secs(config.max_backoff_secs),
        )
        .with_jitter(config.jitter)
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// `attempt` is the 0-indexed number of the request that just failed.
    pub fn should_retry(&self, attempt: u32, error: &CatalogError) -> bool {
        attempt < self.max_retries && error.is_retryable()
    }

    /// Delay before the retry following `attempt`.
    ///
    /// A server hint is used as is, so the retry never arrives before the
    /// server allows it. Only the computed backoff is capped at the maximum.
    pub fn delay_for(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        if let Some(hint) = hint {
            return hint;
        }

        let ceiling = self.backoff(attempt);
        if !self.jitter || ceiling.is_zero() {
            return ceiling;
        }

        // Equal jitter: at least half the backoff, never above it
        let half = ceiling / 2;
        let spread = (ceiling - half).as_millis() as u64;
        half + Duration::from_millis(rand::rng().random_range(0..=spread))
    }

    /// `min(base * 2^attempt, max)`
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.checked_mul(factor).unwrap_or(self.max_delay).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
