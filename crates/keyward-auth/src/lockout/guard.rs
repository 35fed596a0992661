//! Lockout guard: applies [`LockoutPolicy`] to stored accounts.

use std::sync::Arc;

use tracing::{info, warn};

use keyward_core::config::LockoutConfig;
use keyward_core::error::AppError;
use keyward_core::events::{DomainEvent, SecurityEvent};
use keyward_core::result::AppResult;
use keyward_core::traits::{Clock, EventSink};
use keyward_core::types::AccountId;
use keyward_entity::account::Account;
use keyward_store::Store;

use super::policy::{FailureDecision, LockState, LockoutPolicy};
use crate::account::cas::update_account;

/// Tracks failed authentications per account and gates login.
///
/// Counter updates go through the account's version compare-and-swap, so
/// concurrent failures for one account never overwrite each other.
#[derive(Debug, Clone)]
pub struct LockoutGuard {
    store: Store,
    policy: LockoutPolicy,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
    max_update_retries: u32,
}

impl LockoutGuard {
    /// Creates a guard from configuration.
    pub fn new(
        config: &LockoutConfig,
        store: Store,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            store,
            policy: LockoutPolicy::from_config(config),
            clock,
            sink,
            max_update_retries: config.max_update_retries,
        }
    }

    /// The policy in force.
    pub fn policy(&self) -> &LockoutPolicy {
        &self.policy
    }

    /// Whether the account is locked right now.
    pub async fn is_locked(&self, account_id: AccountId) -> AppResult<bool> {
        let account = self
            .store
            .bounded("account.find_by_id", self.store.accounts().find_by_id(account_id))
            .await?
            .ok_or_else(|| AppError::not_found(format!("Account {account_id} not found")))?;
        Ok(account.is_locked_at(self.clock.now()))
    }

    /// Fails with `AccountLocked` if `account` is locked right now.
    pub fn ensure_unlocked(&self, account: &Account) -> AppResult<()> {
        match account.lock_remaining_seconds(self.clock.now()) {
            Some(retry_after) => {
                info!(account_id = %account.id, retry_after, "Login refused: account locked");
                Err(AppError::account_locked(retry_after))
            }
            None => Ok(()),
        }
    }

    /// Counts one failed authentication.
    ///
    /// A no-op while the account is locked. Publishes `AccountLocked` when
    /// this failure engages the lock.
    pub async fn record_failure(&self, account_id: AccountId) -> AppResult<LockState> {
        let now = self.clock.now();
        let mut decision = None;

        update_account(&self.store, account_id, self.max_update_retries, |account| {
            let next = self.policy.next_failure(account, now);
            decision = Some(next);
            Ok(match next {
                FailureDecision::AlreadyLocked { .. } => None,
                FailureDecision::Count {
                    failed_attempts,
                    locked_until,
                } => Some(account.with_failure_state(
                    failed_attempts as i32,
                    Some(now),
                    locked_until,
                    now,
                )),
            })
        })
        .await?;

        let Some(decision) = decision else {
            return Err(AppError::internal("Lockout decision missing after update"));
        };

        if let FailureDecision::Count {
            failed_attempts,
            locked_until: Some(until),
        } = decision
        {
            warn!(
                account_id = %account_id,
                failed_attempts,
                locked_until = %until,
                "Account locked after repeated failures"
            );
            self.sink
                .publish(DomainEvent::security(
                    now,
                    Some(account_id.into_uuid()),
                    SecurityEvent::AccountLocked {
                        account_id: account_id.into_uuid(),
                        failed_attempts,
                        locked_until: until,
                    },
                ))
                .await;
        }

        Ok(self.policy.state_after(decision))
    }

    /// Clears the failure counter and any lock.
    pub async fn reset(&self, account_id: AccountId) -> AppResult<()> {
        let now = self.clock.now();
        update_account(&self.store, account_id, self.max_update_retries, |account| {
            let clean = account.failed_attempts == 0
                && account.last_failed_at.is_none()
                && account.locked_until.is_none();
            Ok((!clean).then(|| account.with_failures_cleared(now)))
        })
        .await?;
        Ok(())
    }
}
