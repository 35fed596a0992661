//! CLI command definitions and dispatch.

pub mod migrate;
pub mod purge;
pub mod sweep;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use keyward_auth::{Argon2Hasher, AuthOrchestrator, TracingEventSink};
use keyward_core::config::AppConfig;
use keyward_core::error::AppError;
use keyward_core::traits::SystemClock;
use keyward_store::Store;

/// Keyward maintenance commands
#[derive(Debug, Parser)]
#[command(name = "keyward", version, about, long_about = None)]
pub struct Cli {
    /// Base configuration file, without extension
    #[arg(short, long, default_value = "config/default")]
    pub config: String,

    /// Environment overlay loaded from `config/<env>.toml`
    #[arg(short, long, env = "KEYWARD_ENV", default_value = "development")]
    pub env: String,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the purge scheduler until interrupted
    Sweep,
    /// Run one purge pass and exit
    Purge,
    /// Apply database migrations
    Migrate,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: AppConfig) -> Result<(), AppError> {
        tracing::info!(
            version = env!("CARGO_PKG_VERSION"),
            env = %self.env,
            "Starting keyward"
        );
        match &self.command {
            Commands::Sweep => sweep::execute(&config).await,
            Commands::Purge => purge::execute(&config).await,
            Commands::Migrate => migrate::execute(&config).await,
        }
    }
}

/// Helper: wire the orchestrator with production collaborators.
pub(crate) async fn build_orchestrator(config: &AppConfig) -> Result<AuthOrchestrator, AppError> {
    if config.auth.uses_default_secret() {
        tracing::warn!("auth.jwt_secret is the shipped placeholder; set KEYWARD__AUTH__JWT_SECRET");
    }
    let store = Store::connect(config).await?;
    Ok(AuthOrchestrator::new(
        config,
        store,
        Arc::new(SystemClock),
        Arc::new(Argon2Hasher),
        Arc::new(TracingEventSink),
    ))
}
