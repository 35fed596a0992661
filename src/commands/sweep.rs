//! Long-running purge scheduler.

use keyward_core::config::AppConfig;
use keyward_core::error::AppError;
use keyward_worker::{CronScheduler, PurgeJob};

/// Start the scheduler and block until Ctrl+C or SIGTERM.
pub async fn execute(config: &AppConfig) -> Result<(), AppError> {
    let orchestrator = super::build_orchestrator(config).await?;
    let job = PurgeJob::new(orchestrator, &config.worker);

    let mut scheduler = CronScheduler::new(job, &config.worker).await?;
    scheduler.register_default_tasks().await?;
    scheduler.start().await?;

    shutdown_signal().await;
    tracing::info!("Shutdown signal received");
    scheduler.shutdown().await
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
