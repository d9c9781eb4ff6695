//! Retry policy and template
//!
//! The template re-runs a whole unit of work: for `call` that is the entire
//! tool dispatch loop, for `stream` only the establishment of the stream.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Duration;

use crate::{Error, Result};

/// Configuration for retry logic
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub retry_on_status: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            min_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            retry_on_status: vec![408, 429, 500, 502, 503, 504],
        }
    }
}

impl RetryConfig {
    /// A configuration that never retries.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }
}

#[async_trait]
pub trait ResiliencePolicy: Send + Sync {
    /// Delay before the next attempt, or `None` to give up.
    ///
    /// `attempt` is 0-based (first failure => attempt=0).
    async fn should_retry(&self, attempt: u32, error: &Error) -> Option<Duration>;
}

pub struct RetryOperator {
    config: RetryConfig,
}

impl RetryOperator {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.config.min_delay.as_millis() as u64;
        let cap = self.config.max_delay.as_millis() as u64;

        // Exponential backoff: base * 2^attempt
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(base.saturating_mul(factor).min(cap))
    }

    fn is_retryable(&self, error: &Error) -> bool {
        match error {
            Error::Vendor {
                status: Some(status),
                ..
            } => self.config.retry_on_status.contains(status),
            other => other.is_retryable(),
        }
    }
}

#[async_trait]
impl ResiliencePolicy for RetryOperator {
    async fn should_retry(&self, attempt: u32, error: &Error) -> Option<Duration> {
        if attempt >= self.config.max_retries || !self.is_retryable(error) {
            return None;
        }
        Some(self.backoff(attempt))
    }
}

/// Runs a unit of work under a [`ResiliencePolicy`].
#[derive(Clone)]
pub struct RetryTemplate {
    policy: Arc<dyn ResiliencePolicy>,
}

impl RetryTemplate {
    pub fn new(policy: Arc<dyn ResiliencePolicy>) -> Self {
        Self { policy }
    }

    pub fn from_config(config: RetryConfig) -> Self {
        Self::new(Arc::new(RetryOperator::new(config)))
    }

    /// Template that runs the unit exactly once.
    pub fn none() -> Self {
        Self::from_config(RetryConfig::disabled())
    }

    /// Execute `op`, re-running it from scratch while the policy allows.
    pub async fn execute<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
        T: Send,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => match self.policy.should_retry(attempt, &err).await {
                    Some(delay) => {
                        tracing::warn!(
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            error = %err,
                            "retrying DashScope call"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => return Err(err),
                },
            }
        }
    }
}

impl Default for RetryTemplate {
    fn default() -> Self {
        Self::from_config(RetryConfig::default())
    }
}

impl std::fmt::Debug for RetryTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryTemplate").finish_non_exhaustive()
    }
}
