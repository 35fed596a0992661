//! Store bundle handed to the auth core.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use keyward_core::config::AppConfig;
use keyward_core::error::AppError;
use keyward_core::result::AppResult;

use crate::traits::{
    AccountStore, InvitationStore, MembershipStore, RefreshTokenStore, WorkspaceStore,
};

/// All store interfaces plus the per-call deadline.
///
/// Cloning is cheap; every field is reference-counted.
#[derive(Debug, Clone)]
pub struct Store {
    accounts: Arc<dyn AccountStore>,
    tokens: Arc<dyn RefreshTokenStore>,
    workspaces: Arc<dyn WorkspaceStore>,
    memberships: Arc<dyn MembershipStore>,
    invitations: Arc<dyn InvitationStore>,
    operation_timeout: Duration,
}

impl Store {
    /// Assemble a store from individual interfaces.
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        tokens: Arc<dyn RefreshTokenStore>,
        workspaces: Arc<dyn WorkspaceStore>,
        memberships: Arc<dyn MembershipStore>,
        invitations: Arc<dyn InvitationStore>,
        operation_timeout: Duration,
    ) -> Self {
        Self {
            accounts,
            tokens,
            workspaces,
            memberships,
            invitations,
            operation_timeout,
        }
    }

    /// Assemble a store from one backend implementing every interface.
    pub fn from_backend<B>(backend: Arc<B>, operation_timeout: Duration) -> Self
    where
        B: AccountStore + RefreshTokenStore + WorkspaceStore + MembershipStore + InvitationStore,
    {
        Self::new(
            backend.clone(),
            backend.clone(),
            backend.clone(),
            backend.clone(),
            backend,
            operation_timeout,
        )
    }

    /// A fresh in-memory store.
    #[cfg(feature = "memory")]
    pub fn in_memory(operation_timeout: Duration) -> Self {
        Self::from_backend(Arc::new(crate::memory::MemoryStore::new()), operation_timeout)
    }

    /// Build the backend named by `store.provider`.
    pub async fn connect(config: &AppConfig) -> AppResult<Self> {
        let timeout = config.store.operation_timeout();
        match config.store.provider.as_str() {
            #[cfg(feature = "postgres")]
            "postgres" => {
                info!("Initializing PostgreSQL store");
                let pool = crate::postgres::DatabasePool::connect(&config.database).await?;
                let backend = crate::postgres::PgStore::new(pool.into_pool());
                Ok(Self::from_backend(Arc::new(backend), timeout))
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!("Initializing in-memory store");
                Ok(Self::in_memory(timeout))
            }
            other => Err(AppError::configuration(format!(
                "Unknown store provider: '{other}'. Supported: memory, postgres"
            ))),
        }
    }

    /// Account interface.
    pub fn accounts(&self) -> &dyn AccountStore {
        self.accounts.as_ref()
    }

    /// Refresh-token interface.
    pub fn tokens(&self) -> &dyn RefreshTokenStore {
        self.tokens.as_ref()
    }

    /// Workspace interface.
    pub fn workspaces(&self) -> &dyn WorkspaceStore {
        self.workspaces.as_ref()
    }

    /// Membership interface.
    pub fn memberships(&self) -> &dyn MembershipStore {
        self.memberships.as_ref()
    }

    /// Invitation interface.
    pub fn invitations(&self) -> &dyn InvitationStore {
        self.invitations.as_ref()
    }

    /// The deadline applied by [`Store::bounded`].
    pub fn operation_timeout(&self) -> Duration {
        self.operation_timeout
    }

    /// Run one store call under the operation deadline.
    ///
    /// An elapsed deadline becomes `ErrorKind::Timeout`, which the
    /// orchestrator treats as transient.
    pub async fn bounded<T, F>(&self, operation: &'static str, call: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        match tokio::time::timeout(self.operation_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    operation,
                    timeout_ms = self.operation_timeout.as_millis() as u64,
                    "Store call timed out"
                );
                Err(AppError::timeout(format!(
                    "Store call '{operation}' exceeded {}ms",
                    self.operation_timeout.as_millis()
                )))
            }
        }
    }
}
