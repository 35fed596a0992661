//! Database migration command.

use keyward_core::config::AppConfig;
use keyward_core::error::AppError;
use keyward_store::postgres::{DatabasePool, migration::run_migrations};

/// Apply pending migrations to the configured database.
pub async fn execute(config: &AppConfig) -> Result<(), AppError> {
    if config.store.provider != "postgres" {
        return Err(AppError::configuration(format!(
            "Migrations need the postgres store, configured provider is '{}'",
            config.store.provider
        )));
    }

    tracing::info!("Running database migrations...");
    let pool = DatabasePool::connect(&config.database).await?;
    run_migrations(pool.pool()).await?;
    tracing::info!("Database migrations complete");
    Ok(())
}
