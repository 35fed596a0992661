//! Integration tests for brute-force lockout.

mod helpers;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Duration;

use helpers::{PASSWORD, TestApp, test_config};
use keyward_core::error::ErrorKind;
use keyward_core::result::AppResult;
use keyward_core::types::AccountId;
use keyward_entity::account::Account;
use keyward_store::memory::MemoryStore;
use keyward_store::{AccountStore, Store};

const WRONG: &str = "Wrong-Horse-42-Battery";

async fn fail(app: &TestApp, times: usize) {
    for _ in 0..times {
        let err = app
            .orchestrator
            .login("alice@x.com", WRONG)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidCredentials);
    }
}

async fn failed_attempts(app: &TestApp, id: AccountId) -> i32 {
    app.orchestrator
        .accounts()
        .get(id)
        .await
        .unwrap()
        .failed_attempts
}

#[tokio::test]
async fn test_five_failures_lock_the_account() {
    let app = TestApp::new();
    let id = app.create_user("alice@x.com").await;

    for _ in 0..5 {
        fail(&app, 1).await;
        app.advance(Duration::minutes(2));
    }
    assert!(app.orchestrator.lockout().is_locked(id).await.unwrap());
    assert_eq!(app.events.lock_alerts(), 1);

    let err = app
        .orchestrator
        .login("alice@x.com", PASSWORD)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccountLocked);
    let retry_after = err.retry_after_seconds.unwrap();
    assert!(retry_after > 0 && retry_after <= 30 * 60);
}

#[tokio::test]
async fn test_locked_account_ignores_further_failures() {
    let app = TestApp::new();
    let id = app.create_user("alice@x.com").await;
    fail(&app, 5).await;

    let err = app
        .orchestrator
        .login("alice@x.com", WRONG)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::AccountLocked);
    assert_eq!(failed_attempts(&app, id).await, 5);
    assert_eq!(app.events.lock_alerts(), 1);
}

#[tokio::test]
async fn test_success_resets_counter() {
    let app = TestApp::new();
    let id = app.create_user("alice@x.com").await;

    fail(&app, 4).await;
    app.login("alice@x.com").await;
    assert_eq!(failed_attempts(&app, id).await, 0);

    fail(&app, 4).await;
    assert!(!app.orchestrator.lockout().is_locked(id).await.unwrap());
}

#[tokio::test]
async fn test_failure_after_window_restarts_count() {
    let app = TestApp::new();
    let id = app.create_user("alice@x.com").await;

    fail(&app, 4).await;
    app.advance(Duration::minutes(16));
    fail(&app, 1).await;
    assert_eq!(failed_attempts(&app, id).await, 1);

    fail(&app, 3).await;
    assert!(!app.orchestrator.lockout().is_locked(id).await.unwrap());
    fail(&app, 1).await;
    assert!(app.orchestrator.lockout().is_locked(id).await.unwrap());
}

#[tokio::test]
async fn test_failure_after_lock_expiry_counts_as_first() {
    let app = TestApp::new();
    let id = app.create_user("alice@x.com").await;
    fail(&app, 5).await;

    app.advance(Duration::minutes(29));
    assert!(app.orchestrator.lockout().is_locked(id).await.unwrap());

    app.advance(Duration::minutes(2));
    assert!(!app.orchestrator.lockout().is_locked(id).await.unwrap());

    fail(&app, 1).await;
    assert_eq!(failed_attempts(&app, id).await, 1);
    assert!(!app.orchestrator.lockout().is_locked(id).await.unwrap());
}

#[tokio::test]
async fn test_login_after_lock_expiry_succeeds() {
    let app = TestApp::new();
    let id = app.create_user("alice@x.com").await;
    fail(&app, 5).await;

    app.advance(Duration::minutes(31));
    app.login("alice@x.com").await;
    assert_eq!(failed_attempts(&app, id).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_failures_are_all_counted() {
    let app = TestApp::new();
    let id = app.create_user("alice@x.com").await;

    let mut handles = Vec::new();
    for _ in 0..5 {
        let orchestrator = app.orchestrator.clone();
        handles.push(tokio::spawn(async move {
            orchestrator.login("alice@x.com", WRONG).await
        }));
    }
    for handle in handles {
        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidCredentials);
    }

    assert_eq!(failed_attempts(&app, id).await, 5);
    assert!(app.orchestrator.lockout().is_locked(id).await.unwrap());
    assert_eq!(app.events.lock_alerts(), 1);
}

/// Account store that, once armed, lands a failed attempt right after
/// handing out the email-lookup snapshot, so the caller holds a stale copy.
#[derive(Debug)]
struct FailureAfterLookup {
    inner: Arc<MemoryStore>,
    armed: AtomicBool,
}

#[async_trait]
impl AccountStore for FailureAfterLookup {
    async fn insert(&self, account: &Account) -> AppResult<()> {
        AccountStore::insert(self.inner.as_ref(), account).await
    }

    async fn find_by_id(&self, id: AccountId) -> AppResult<Option<Account>> {
        AccountStore::find_by_id(self.inner.as_ref(), id).await
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let snapshot = self.inner.find_by_email(email).await?;
        if let Some(account) = &snapshot {
            if self.armed.swap(false, Ordering::SeqCst) {
                let failed = account.with_failure_state(
                    account.failed_attempts + 1,
                    Some(account.updated_at),
                    None,
                    account.updated_at,
                );
                self.inner.compare_and_swap(&failed, account.version).await?;
            }
        }
        Ok(snapshot)
    }

    async fn compare_and_swap(&self, updated: &Account, expected_version: i64) -> AppResult<bool> {
        self.inner.compare_and_swap(updated, expected_version).await
    }
}

#[tokio::test]
async fn test_success_clears_failure_recorded_after_lookup() {
    let config = test_config();
    let memory = Arc::new(MemoryStore::new());
    let accounts = Arc::new(FailureAfterLookup {
        inner: memory.clone(),
        armed: AtomicBool::new(false),
    });
    let store = Store::new(
        accounts.clone(),
        memory.clone(),
        memory.clone(),
        memory.clone(),
        memory,
        config.store.operation_timeout(),
    );
    let app = TestApp::with_store(config, store);
    let id = app.create_user("alice@x.com").await;
    assert_eq!(failed_attempts(&app, id).await, 0);

    accounts.armed.store(true, Ordering::SeqCst);
    app.login("alice@x.com").await;

    assert!(!accounts.armed.load(Ordering::SeqCst));
    assert_eq!(failed_attempts(&app, id).await, 0);
}
