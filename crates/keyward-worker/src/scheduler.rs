//! Cron scheduler for periodic maintenance tasks.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use tracing;

use keyward_core::config::WorkerConfig;
use keyward_core::error::AppError;

use crate::jobs::PurgeJob;

/// Cron-based scheduler for the purge job.
pub struct CronScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Job run on every tick
    purge: Arc<PurgeJob>,
    /// Cron expression, seconds first
    purge_cron: String,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler")
            .field("purge_cron", &self.purge_cron)
            .finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler
    pub async fn new(purge: PurgeJob, config: &WorkerConfig) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self {
            scheduler,
            purge: Arc::new(purge),
            purge_cron: config.purge_cron.clone(),
        })
    }

    /// Register all scheduled tasks
    pub async fn register_default_tasks(&self) -> Result<(), AppError> {
        self.register_purge().await?;
        tracing::info!("All scheduled tasks registered");
        Ok(())
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Cron scheduler shut down");
        Ok(())
    }

    /// Invitation expiry and refresh-token purge
    async fn register_purge(&self) -> Result<(), AppError> {
        let purge = Arc::clone(&self.purge);
        let job = CronJob::new_async(self.purge_cron.as_str(), move |_uuid, _lock| {
            let purge = Arc::clone(&purge);
            Box::pin(async move {
                tracing::debug!("Purge tick");
                if let Err(e) = purge.run().await {
                    tracing::error!(error = %e, "Scheduled purge failed");
                }
            })
        })
        .map_err(|e| {
            AppError::configuration(format!(
                "Invalid purge schedule '{}': {e}",
                self.purge_cron
            ))
        })?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add purge schedule: {e}")))?;

        tracing::info!(cron = %self.purge_cron, "Registered: purge");
        Ok(())
    }
}
