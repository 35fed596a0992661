//! One-shot purge.

use keyward_core::config::AppConfig;
use keyward_core::error::AppError;
use keyward_worker::PurgeJob;

/// Run one purge pass and print the report.
pub async fn execute(config: &AppConfig) -> Result<(), AppError> {
    let orchestrator = super::build_orchestrator(config).await?;
    let report = PurgeJob::new(orchestrator, &config.worker).run().await?;
    println!(
        "Expired {} invitation(s), purged {} refresh-token record(s)",
        report.expired_invitations, report.purged_refresh_tokens
    );
    Ok(())
}
