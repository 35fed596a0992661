//! Store backend configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Store backend selection and per-call limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend: `"memory"` or `"postgres"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Deadline applied to every store call, in milliseconds.
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_ms: u64,
    /// Retry policy for transient store failures.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl StoreConfig {
    /// The per-call deadline as a [`Duration`].
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            operation_timeout_ms: default_operation_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

/// Exponential backoff for transient failures at the orchestrator boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,
    /// Upper bound on any single delay, in milliseconds.
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

fn default_provider() -> String {
    "memory".to_string()
}

fn default_operation_timeout() -> u64 {
    5000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff() -> u64 {
    50
}

fn default_max_backoff() -> u64 {
    1000
}
