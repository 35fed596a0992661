//! Background sweep configuration.

use serde::{Deserialize, Serialize};

/// Periodic purge settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Cron expression (with seconds) for the purge job.
    #[serde(default = "default_purge_cron")]
    pub purge_cron: String,
    /// Days an expired refresh-token record is kept for replay detection.
    #[serde(default = "default_retention")]
    pub refresh_token_retention_days: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            purge_cron: default_purge_cron(),
            refresh_token_retention_days: default_retention(),
        }
    }
}

fn default_purge_cron() -> String {
    "0 */15 * * * *".to_string()
}

fn default_retention() -> u64 {
    30
}
