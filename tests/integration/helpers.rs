//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use keyward_auth::AuthOrchestrator;
use keyward_auth::orchestrator::RetryPolicy;
use keyward_core::config::AppConfig;
use keyward_core::events::{DomainEvent, EventPayload, SecurityEvent, WorkspaceEvent};
use keyward_core::result::AppResult;
use keyward_core::traits::{Clock, CredentialHasher, EventSink, ManualClock};
use keyward_core::types::{AccountId, WorkspaceId};
use keyward_entity::token::TokenPair;
use keyward_store::Store;

/// Password accepted by the default policy.
pub const PASSWORD: &str = "Correct-Horse-42-Battery";

/// Hasher with a reversible digest; keeps tests fast.
#[derive(Debug, Default)]
pub struct PlainHasher;

impl CredentialHasher for PlainHasher {
    fn hash(&self, plain: &str) -> AppResult<String> {
        Ok(format!("plain${plain}"))
    }

    fn verify(&self, plain: &str, digest: &str) -> AppResult<bool> {
        Ok(digest.strip_prefix("plain$") == Some(plain))
    }
}

/// Sink keeping every published event.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingSink {
    /// Snapshot of everything published so far.
    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Security events only.
    pub fn security(&self) -> Vec<SecurityEvent> {
        self.events()
            .into_iter()
            .filter_map(|e| match e.payload {
                EventPayload::Security(s) => Some(s),
                EventPayload::Workspace(_) => None,
            })
            .collect()
    }

    /// Workspace events only.
    pub fn workspace(&self) -> Vec<WorkspaceEvent> {
        self.events()
            .into_iter()
            .filter_map(|e| match e.payload {
                EventPayload::Workspace(w) => Some(w),
                EventPayload::Security(_) => None,
            })
            .collect()
    }

    /// Number of `TokenReuseDetected` events.
    pub fn reuse_alerts(&self) -> usize {
        self.security()
            .iter()
            .filter(|e| matches!(e, SecurityEvent::TokenReuseDetected { .. }))
            .count()
    }

    /// Number of `AccountLocked` events.
    pub fn lock_alerts(&self) -> usize {
        self.security()
            .iter()
            .filter(|e| matches!(e, SecurityEvent::AccountLocked { .. }))
            .count()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn publish(&self, event: DomainEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Test application context
pub struct TestApp {
    /// Fully wired orchestrator over the memory store
    pub orchestrator: AuthOrchestrator,
    /// Clock driving every expiry computation
    pub clock: Arc<ManualClock>,
    /// Every published event
    pub events: Arc<RecordingSink>,
    /// Configuration in force
    pub config: AppConfig,
}

/// Default configuration with fast retries.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.jwt_secret = "integration-test-secret-0123456789abcdef".to_string();
    config.store.retry.initial_backoff_ms = 1;
    config.store.retry.max_backoff_ms = 4;
    config
}

impl TestApp {
    /// Create a new test application
    pub fn new() -> Self {
        let config = test_config();
        let store = Store::in_memory(config.store.operation_timeout());
        Self::with_store(config, store)
    }

    /// Create a test application over a custom store
    pub fn with_store(config: AppConfig, store: Store) -> Self {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
        ));
        let events = Arc::new(RecordingSink::default());
        let orchestrator = AuthOrchestrator::new(
            &config,
            store,
            clock.clone(),
            Arc::new(PlainHasher),
            events.clone(),
        )
        .with_retry(RetryPolicy::from_config(&config.store.retry).without_jitter());

        Self {
            orchestrator,
            clock,
            events,
            config,
        }
    }

    /// Register an account with [`PASSWORD`]
    pub async fn create_user(&self, email: &str) -> AccountId {
        self.orchestrator
            .register(email, PASSWORD)
            .await
            .expect("Failed to register test user")
    }

    /// Log in with [`PASSWORD`]
    pub async fn login(&self, email: &str) -> TokenPair {
        self.orchestrator
            .login(email, PASSWORD)
            .await
            .expect("Failed to log in test user")
    }

    /// Register an owner and create a workspace for them
    pub async fn create_workspace(&self, owner_email: &str, name: &str) -> (AccountId, WorkspaceId) {
        let owner = self.create_user(owner_email).await;
        let workspace = self
            .orchestrator
            .create_workspace(name, owner)
            .await
            .expect("Failed to create workspace");
        (owner, workspace)
    }

    /// Current test time
    pub fn clock_now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Advance the clock
    pub fn advance(&self, by: chrono::Duration) {
        self.clock.advance(by);
    }
}

/// A store call that never answers in time.
pub async fn stall<T>() -> AppResult<T> {
    std::future::pending().await
}
