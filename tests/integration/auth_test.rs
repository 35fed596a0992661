//! Integration tests for login, refresh-token lineage and authorization.

mod helpers;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::Duration;

use helpers::{PASSWORD, TestApp, stall, test_config};
use keyward_core::error::{AppError, ErrorKind};
use keyward_core::result::AppResult;
use keyward_core::types::AccountId;
use keyward_entity::account::{Account, AccountStatus};
use keyward_entity::membership::MemberRole;
use keyward_store::memory::MemoryStore;
use keyward_store::{AccountStore, Store};

#[tokio::test]
async fn test_login_issues_unscoped_pair() {
    let app = TestApp::new();
    let id = app.create_user("alice@x.com").await;

    let pair = app.login("alice@x.com").await;
    assert_eq!(pair.token_type, "Bearer");
    assert_eq!(pair.expires_in, 15 * 60);

    let claims = app.orchestrator.authorize(&pair.access_token).await.unwrap();
    assert_eq!(claims.sub, id);
    assert_eq!(claims.email, "alice@x.com");
    assert!(claims.wid.is_none());
    assert!(claims.role.is_none());
}

#[tokio::test]
async fn test_login_email_is_case_insensitive() {
    let app = TestApp::new();
    app.create_user("Alice@X.com").await;
    assert!(app.orchestrator.login("  ALICE@x.COM ", PASSWORD).await.is_ok());
}

#[tokio::test]
async fn test_credential_failures_are_indistinguishable() {
    let app = TestApp::new();
    app.create_user("alice@x.com").await;

    let unknown = app
        .orchestrator
        .login("nobody@x.com", PASSWORD)
        .await
        .unwrap_err();
    let wrong = app
        .orchestrator
        .login("alice@x.com", "Wrong-Horse-42-Battery")
        .await
        .unwrap_err();

    assert_eq!(unknown.kind, ErrorKind::InvalidCredentials);
    assert_eq!(wrong.kind, ErrorKind::InvalidCredentials);
    assert_eq!(unknown.public_message(), wrong.public_message());
    assert_ne!(unknown.message, wrong.message);
}

#[tokio::test]
async fn test_refresh_is_single_use_and_reuse_revokes_lineage() {
    let app = TestApp::new();
    app.create_user("alice@x.com").await;
    let first = app.login("alice@x.com").await;

    let second = app.orchestrator.refresh(&first.refresh_token).await.unwrap();
    assert_ne!(second.refresh_token, first.refresh_token);
    assert!(app.orchestrator.authorize(&second.access_token).await.is_ok());

    let replay = app
        .orchestrator
        .refresh(&first.refresh_token)
        .await
        .unwrap_err();
    assert_eq!(replay.kind, ErrorKind::TokenReuseDetected);
    assert_eq!(replay.public_message(), AppError::invalid_token("x").public_message());
    assert_eq!(app.events.reuse_alerts(), 1);

    // Every token of the lineage is dead now.
    assert!(app.orchestrator.refresh(&second.refresh_token).await.is_err());
    for access in [&first.access_token, &second.access_token] {
        let err = app.orchestrator.authorize(access).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidToken);
    }
}

#[tokio::test]
async fn test_reuse_leaves_other_lineages_alone() {
    let app = TestApp::new();
    app.create_user("alice@x.com").await;
    let laptop = app.login("alice@x.com").await;
    let phone = app.login("alice@x.com").await;

    app.orchestrator.refresh(&laptop.refresh_token).await.unwrap();
    assert!(app.orchestrator.refresh(&laptop.refresh_token).await.is_err());

    let rotated = app.orchestrator.refresh(&phone.refresh_token).await.unwrap();
    assert!(app.orchestrator.authorize(&rotated.access_token).await.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_refresh_has_one_winner() {
    let app = TestApp::new();
    app.create_user("alice@x.com").await;
    let pair = app.login("alice@x.com").await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let orchestrator = app.orchestrator.clone();
        let token = pair.refresh_token.clone();
        handles.push(tokio::spawn(async move { orchestrator.refresh(&token).await }));
    }

    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => winners += 1,
            Err(e) => assert_eq!(e.kind, ErrorKind::TokenReuseDetected),
        }
    }
    assert_eq!(winners, 1);
    assert!(app.events.reuse_alerts() >= 1);
}

#[tokio::test]
async fn test_expired_access_token_is_rejected() {
    let app = TestApp::new();
    app.create_user("alice@x.com").await;
    let pair = app.login("alice@x.com").await;

    app.advance(Duration::minutes(14));
    assert!(app.orchestrator.authorize(&pair.access_token).await.is_ok());

    app.advance(Duration::minutes(2));
    let err = app.orchestrator.authorize(&pair.access_token).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::TokenExpired);
}

#[tokio::test]
async fn test_tampered_access_token_is_invalid() {
    let app = TestApp::new();
    app.create_user("alice@x.com").await;
    app.create_user("mallory@x.com").await;
    let alice = app.login("alice@x.com").await;
    let mallory = app.login("mallory@x.com").await;

    // Alice's claims under Mallory's signature.
    let alice_parts: Vec<&str> = alice.access_token.split('.').collect();
    let mallory_parts: Vec<&str> = mallory.access_token.split('.').collect();
    let forged = format!("{}.{}.{}", alice_parts[0], alice_parts[1], mallory_parts[2]);

    let err = app.orchestrator.authorize(&forged).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidToken);
    assert!(app.orchestrator.authorize("not-a-jwt").await.is_err());
}

#[tokio::test]
async fn test_expired_refresh_token() {
    let app = TestApp::new();
    app.create_user("alice@x.com").await;
    let pair = app.login("alice@x.com").await;

    app.advance(Duration::days(15));
    let err = app.orchestrator.refresh(&pair.refresh_token).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::TokenExpired);
    assert_eq!(app.events.reuse_alerts(), 0);
}

#[tokio::test]
async fn test_unknown_refresh_token() {
    let app = TestApp::new();
    let err = app.orchestrator.refresh("deadbeef").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidToken);
}

#[tokio::test]
async fn test_logout_revokes_lineage() {
    let app = TestApp::new();
    app.create_user("alice@x.com").await;
    let pair = app.login("alice@x.com").await;

    app.orchestrator.logout(&pair.refresh_token).await.unwrap();
    assert!(app.orchestrator.refresh(&pair.refresh_token).await.is_err());
    let err = app.orchestrator.authorize(&pair.access_token).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidToken);

    // Unknown tokens are ignored.
    app.orchestrator.logout("unknown").await.unwrap();
}

#[tokio::test]
async fn test_workspace_login_scopes_claims() {
    let app = TestApp::new();
    let (owner, workspace) = app.create_workspace("owner@x.com", "Acme").await;

    let pair = app
        .orchestrator
        .login_to_workspace("owner@x.com", PASSWORD, workspace)
        .await
        .unwrap();
    let claims = app.orchestrator.authorize(&pair.access_token).await.unwrap();
    assert_eq!(claims.sub, owner);
    assert_eq!(claims.wid, Some(workspace));
    assert_eq!(claims.role, Some(MemberRole::Owner));

    app.create_user("stranger@x.com").await;
    let err = app
        .orchestrator
        .login_to_workspace("stranger@x.com", PASSWORD, workspace)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);
}

#[tokio::test]
async fn test_refresh_rereads_workspace_role() {
    let app = TestApp::new();
    let (owner, workspace) = app.create_workspace("owner@x.com", "Acme").await;
    let bob = app.create_user("bob@x.com").await;
    app.orchestrator
        .add_member(workspace, bob, MemberRole::Member, owner)
        .await
        .unwrap();

    let pair = app
        .orchestrator
        .login_to_workspace("bob@x.com", PASSWORD, workspace)
        .await
        .unwrap();

    app.orchestrator
        .change_role(workspace, bob, MemberRole::Admin, owner)
        .await
        .unwrap();
    let promoted = app.orchestrator.refresh(&pair.refresh_token).await.unwrap();
    let claims = app.orchestrator.authorize(&promoted.access_token).await.unwrap();
    assert_eq!(claims.role, Some(MemberRole::Admin));

    app.orchestrator
        .remove_member(workspace, bob, owner)
        .await
        .unwrap();
    let err = app
        .orchestrator
        .refresh(&promoted.refresh_token)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidToken);
    assert!(app.orchestrator.authorize(&promoted.access_token).await.is_err());
}

#[tokio::test]
async fn test_change_password_revokes_sessions() {
    let app = TestApp::new();
    let id = app.create_user("alice@x.com").await;
    let pair = app.login("alice@x.com").await;
    let new_password = "Purple-Staple-77-Orbit";

    let err = app
        .orchestrator
        .change_password(id, "Wrong-Horse-42-Battery", new_password)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidCredentials);

    app.orchestrator
        .change_password(id, PASSWORD, new_password)
        .await
        .unwrap();

    assert!(app.orchestrator.refresh(&pair.refresh_token).await.is_err());
    assert!(app.orchestrator.authorize(&pair.access_token).await.is_err());
    assert!(app.orchestrator.login("alice@x.com", PASSWORD).await.is_err());
    assert!(app.orchestrator.login("alice@x.com", new_password).await.is_ok());
}

#[tokio::test]
async fn test_suspended_account_cannot_log_in_or_refresh() {
    let app = TestApp::new();
    let id = app.create_user("alice@x.com").await;
    let pair = app.login("alice@x.com").await;

    app.orchestrator
        .set_account_status(id, AccountStatus::Suspended)
        .await
        .unwrap();

    let err = app.orchestrator.login("alice@x.com", PASSWORD).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);
    assert!(app.orchestrator.refresh(&pair.refresh_token).await.is_err());

    app.orchestrator
        .set_account_status(id, AccountStatus::Active)
        .await
        .unwrap();
    assert!(app.orchestrator.login("alice@x.com", PASSWORD).await.is_ok());
}

#[tokio::test]
async fn test_deleted_account_frees_email() {
    let app = TestApp::new();
    let id = app.create_user("alice@x.com").await;

    app.orchestrator
        .set_account_status(id, AccountStatus::Deleted)
        .await
        .unwrap();
    let err = app.orchestrator.login("alice@x.com", PASSWORD).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidCredentials);

    let err = app
        .orchestrator
        .set_account_status(id, AccountStatus::Active)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    let again = app.create_user("alice@x.com").await;
    assert_ne!(again, id);
}

#[tokio::test]
async fn test_register_rejects_bad_input() {
    let app = TestApp::new();
    app.create_user("alice@x.com").await;

    let dup = app
        .orchestrator
        .register("ALICE@x.com", PASSWORD)
        .await
        .unwrap_err();
    assert_eq!(dup.kind, ErrorKind::Conflict);

    let weak = app
        .orchestrator
        .register("bob@x.com", "password")
        .await
        .unwrap_err();
    assert_eq!(weak.kind, ErrorKind::Validation);

    let email = app
        .orchestrator
        .register("not-an-email", PASSWORD)
        .await
        .unwrap_err();
    assert_eq!(email.kind, ErrorKind::Validation);
}

/// Account store whose email lookups fail transiently or hang.
#[derive(Debug)]
struct FaultyAccounts {
    inner: Arc<MemoryStore>,
    transient_failures: AtomicU32,
    hang: bool,
}

#[async_trait]
impl AccountStore for FaultyAccounts {
    async fn insert(&self, account: &Account) -> AppResult<()> {
        AccountStore::insert(self.inner.as_ref(), account).await
    }

    async fn find_by_id(&self, id: AccountId) -> AppResult<Option<Account>> {
        AccountStore::find_by_id(self.inner.as_ref(), id).await
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        if self.hang {
            return stall().await;
        }
        let failed = self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(AppError::unavailable("connection reset"));
        }
        self.inner.find_by_email(email).await
    }

    async fn compare_and_swap(&self, updated: &Account, expected_version: i64) -> AppResult<bool> {
        self.inner.compare_and_swap(updated, expected_version).await
    }
}

fn faulty_app(transient_failures: u32, hang: bool) -> TestApp {
    let config = test_config();
    let memory = Arc::new(MemoryStore::new());
    let accounts = Arc::new(FaultyAccounts {
        inner: memory.clone(),
        transient_failures: AtomicU32::new(transient_failures),
        hang,
    });
    let store = Store::new(
        accounts,
        memory.clone(),
        memory.clone(),
        memory.clone(),
        memory,
        StdDuration::from_millis(50),
    );
    TestApp::with_store(config, store)
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let app = faulty_app(2, false);
    app.create_user("alice@x.com").await;
    assert!(app.orchestrator.login("alice@x.com", PASSWORD).await.is_ok());
}

#[tokio::test]
async fn test_persistent_transient_failure_surfaces_as_unavailable() {
    let app = faulty_app(10, false);
    app.create_user("alice@x.com").await;
    let err = app.orchestrator.login("alice@x.com", PASSWORD).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ServiceUnavailable);
    assert_eq!(err.http_status(), 503);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_store_times_out() {
    let app = faulty_app(0, true);
    app.create_user("alice@x.com").await;
    let err = app.orchestrator.login("alice@x.com", PASSWORD).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::ServiceUnavailable);
    let cause = err.source.as_ref().map(|s| s.to_string()).unwrap_or_default();
    assert!(cause.starts_with("TIMEOUT"));
}
