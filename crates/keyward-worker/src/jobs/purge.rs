//! Invitation expiry and refresh-token purge.

use chrono::Duration;
use serde::Serialize;

use keyward_auth::AuthOrchestrator;
use keyward_core::config::WorkerConfig;
use keyward_core::result::AppResult;

/// Outcome of one purge run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    /// Pending invitations marked expired.
    pub expired_invitations: u64,
    /// Refresh-token records deleted.
    pub purged_refresh_tokens: u64,
}

/// Runs both sweeps against one orchestrator.
#[derive(Debug, Clone)]
pub struct PurgeJob {
    orchestrator: AuthOrchestrator,
    retention: Duration,
}

impl PurgeJob {
    /// Create a purge job keeping expired token records for the configured
    /// retention window.
    pub fn new(orchestrator: AuthOrchestrator, config: &WorkerConfig) -> Self {
        Self {
            orchestrator,
            retention: Duration::days(config.refresh_token_retention_days as i64),
        }
    }

    /// Run both sweeps. A failing sweep does not skip the other; the first
    /// error is returned after both ran.
    pub async fn run(&self) -> AppResult<PurgeReport> {
        tracing::info!("Running purge");

        let invitations = self.orchestrator.purge_expired_invitations().await;
        if let Err(e) = &invitations {
            tracing::error!(error = %e, "Invitation expiry sweep failed");
        }

        let tokens = self.orchestrator.purge_refresh_tokens(self.retention).await;
        if let Err(e) = &tokens {
            tracing::error!(error = %e, "Refresh-token purge failed");
        }

        let report = PurgeReport {
            expired_invitations: invitations?,
            purged_refresh_tokens: tokens?,
        };
        tracing::info!(
            expired_invitations = report.expired_invitations,
            purged_refresh_tokens = report.purged_refresh_tokens,
            "Purge complete"
        );
        Ok(report)
    }
}
