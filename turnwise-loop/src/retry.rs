//! Exponential backoff for opening streamed calls.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use turnwise_types::{ProtocolStream, Provider, ProviderError, ProviderRequest};

use crate::config::ConfigError;

/// How transient failures to open a call are retried.
///
/// Attempt `n` (1-based) waits `base_delay_ms * 2^(n-1)`, capped at
/// `max_delay_ms`. A server-provided `Retry-After` replaces the computed
/// delay, still capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,
    /// Upper bound on any single delay, in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Reject a cap below the base delay.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_delay_ms < self.base_delay_ms {
            return Err(ConfigError::Invalid(format!(
                "retry: max_delay_ms ({}) is below base_delay_ms ({})",
                self.max_delay_ms, self.base_delay_ms
            )));
        }
        Ok(())
    }

    /// Delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn backoff_delay_for_attempt(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(31);
        let factor = 1_u64 << shift;
        let delay_ms = self
            .base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }

    /// Delay before retry number `attempt` after `error`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32, error: &ProviderError) -> Duration {
        let cap = Duration::from_millis(self.max_delay_ms);
        match error.retry_after() {
            Some(hint) => hint.min(cap),
            None => self.backoff_delay_for_attempt(attempt),
        }
    }
}

/// Open a streamed call, retrying retryable failures.
///
/// Only opening is retried. Once a stream is returned its failures belong
/// to the decoder.
pub async fn open_with_retry<P: Provider>(
    provider: &P,
    request: &ProviderRequest,
    policy: &RetryPolicy,
) -> Result<ProtocolStream, ProviderError> {
    let mut attempt = 0_u32;
    loop {
        match provider.stream(request.clone()).await {
            Ok(stream) => return Ok(stream),
            Err(error) => {
                if !error.is_retryable() || attempt >= policy.max_retries {
                    return Err(error);
                }
                attempt += 1;
                let delay = policy.delay_for(attempt, &error);
                tracing::warn!(
                    model = %request.model,
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "turnwise.llm.retry"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
