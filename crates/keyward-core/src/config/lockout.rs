//! Brute-force lockout configuration.

use serde::{Deserialize, Serialize};

/// Failed-login lockout policy.
///
/// `max_failed_attempts` consecutive failures, each within `window_minutes`
/// of the previous one, lock the account for `lockout_minutes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockoutConfig {
    /// Failures that trigger a lock.
    #[serde(default = "default_max_failed")]
    pub max_failed_attempts: u32,
    /// Sliding window between consecutive failures, in minutes.
    #[serde(default = "default_window")]
    pub window_minutes: u64,
    /// Lock duration in minutes.
    #[serde(default = "default_lockout")]
    pub lockout_minutes: u64,
    /// Compare-and-swap retries before a counter update gives up.
    #[serde(default = "default_update_retries")]
    pub max_update_retries: u32,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: default_max_failed(),
            window_minutes: default_window(),
            lockout_minutes: default_lockout(),
            max_update_retries: default_update_retries(),
        }
    }
}

fn default_max_failed() -> u32 {
    5
}

fn default_window() -> u64 {
    15
}

fn default_lockout() -> u64 {
    30
}

fn default_update_retries() -> u32 {
    5
}
