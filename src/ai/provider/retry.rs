//! Transport Retry
//!
//! Retries a provider call with exponential backoff when the failure is
//! transient (rate limit, network, 5xx). Content-level retries (bad drafts,
//! rejected reviews) are the pipeline's job and never happen here.

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use std::time::Duration;
use tracing::warn;

use super::{LlmProvider, LlmResponse, SharedProvider};
use crate::constants::retry as retry_constants;
use crate::types::{DraftsmithError, Result};

/// Backoff settings for [`RetryingProvider`]
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: retry_constants::DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(retry_constants::BASE_DELAY_MS),
            max_delay: Duration::from_secs(retry_constants::MAX_DELAY_SECS),
            backoff_factor: retry_constants::BACKOFF_FACTOR,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Backoff step stretched to the provider's hint, never past `max_delay`
    fn delay_for(&self, err: &DraftsmithError, backoff: Duration) -> Duration {
        match err.retry_after() {
            Some(hint) => backoff.max(hint).min(self.max_delay),
            None => backoff,
        }
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_delay(self.max_delay)
            .with_factor(self.backoff_factor)
            .with_max_times(self.max_retries)
            .with_jitter()
    }
}

/// Provider wrapper adding transport retries
pub struct RetryingProvider {
    inner: SharedProvider,
    policy: RetryPolicy,
}

impl RetryingProvider {
    pub fn new(inner: SharedProvider, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl LlmProvider for RetryingProvider {
    async fn generate(&self, prompt: &str) -> Result<LlmResponse> {
        (|| async { self.inner.generate(prompt).await })
            .retry(self.policy.backoff())
            .when(DraftsmithError::is_transient)
            .adjust(|err: &DraftsmithError, delay: Option<Duration>| {
                delay.map(|d| self.policy.delay_for(err, d))
            })
            .notify(|err: &DraftsmithError, delay: Duration| {
                warn!(
                    provider = self.inner.name(),
                    delay_ms = delay.as_millis() as u64,
                    "Transient provider failure, retrying: {}",
                    err
                );
            })
            .await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn health_check(&self) -> Result<bool> {
        self.inner.health_check().await
    }
}
