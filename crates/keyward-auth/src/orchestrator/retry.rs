//! Retry with exponential backoff for transient store failures.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use keyward_core::config::RetryConfig;
use keyward_core::error::{AppError, ErrorKind};
use keyward_core::result::AppResult;

/// Bounded retry applied at the orchestrator boundary.
///
/// Only `Timeout` and `Unavailable` are retried. Every other error is returned
/// on first sight. Once the attempts are used up the last transient error is
/// wrapped in `ServiceUnavailable`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
    jitter: bool,
}

impl RetryPolicy {
    /// Builds the policy from store configuration.
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            jitter: true,
        }
    }

    /// A policy that runs the operation exactly once.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            jitter: false,
        }
    }

    /// Disables jitter, making delays deterministic.
    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Total attempts including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Runs `call` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut call: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut backoff = self.initial_backoff;
        let mut attempt = 1;

        loop {
            let err = match call().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => e,
            };

            if attempt >= self.max_attempts {
                warn!(
                    operation,
                    attempts = attempt,
                    error = %err,
                    "Transient failure persisted; giving up"
                );
                return Err(AppError::with_source(
                    ErrorKind::ServiceUnavailable,
                    format!("{operation} failed after {attempt} attempts"),
                    err,
                ));
            }

            let delay = self.jittered(backoff);
            warn!(
                operation,
                attempt,
                max_attempts = self.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Transient failure; retrying"
            );
            tokio::time::sleep(delay).await;

            attempt += 1;
            backoff = (backoff * 2).min(self.max_backoff);
        }
    }

    fn jittered(&self, base: Duration) -> Duration {
        if !self.jitter || base.is_zero() {
            return base;
        }
        // ±25%
        let factor = rand::thread_rng().gen_range(0.75..1.25);
        base.mul_f64(factor).min(self.max_backoff)
    }
}
