//! Retry policy with capped exponential backoff.
//!
//! A failed attempt is retried only when [`RequestError::is_retryable`]
//! accepts the error. The delay before retry `k` (1-indexed) is `base_delay * 2^(k-1)`, capped
//! at `max_delay`. Cancellation aborts both the running attempt and the
//! backoff sleep.

use crate::config::RetryConfig;
use crate::error::RequestError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How failed requests are retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(2000),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// Total attempts including the first one.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before the given 1-indexed retry.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Run `operation` until it succeeds, fails permanently, runs out of
    /// attempts or `cancel` fires.
    ///
    /// The operation receives the 1-based attempt number. On exhaustion the
    /// last error is returned unchanged.
    pub async fn run<T, F, Fut>(
        &self,
        label: &str,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T, RequestError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, RequestError>>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RequestError::Cancelled),
                result = operation(attempt) => result,
            };

            let err = match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        info!("{}: succeeded on attempt {}", label, attempt);
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !err.is_retryable() {
                debug!("{}: non-retryable failure: {}", label, err);
                return Err(err);
            }

            if attempt >= max_attempts {
                warn!("{}: giving up after {} attempts: {}", label, attempt, err);
                return Err(err);
            }

            let delay = self.delay_for(attempt);
            warn!(
                "{}: attempt {}/{} failed ({}), retrying in {}ms",
                label,
                attempt,
                max_attempts,
                err,
                delay.as_millis()
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RequestError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
