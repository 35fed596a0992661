//! Account service.

use std::sync::Arc;

use tracing::info;
use validator::ValidateEmail;

use keyward_core::config::{AuthConfig, LockoutConfig};
use keyward_core::error::AppError;
use keyward_core::events::{DomainEvent, SecurityEvent};
use keyward_core::result::AppResult;
use keyward_core::traits::{Clock, CredentialHasher, EventSink};
use keyward_core::types::{AccountId, normalize_email};
use keyward_entity::account::{Account, AccountStatus};
use keyward_store::Store;

use super::cas::update_account;
use crate::password::PasswordValidator;
use crate::token::TokenService;

/// Validates and normalises an email address.
pub fn parse_email(raw: &str) -> AppResult<String> {
    let email = normalize_email(raw);
    if email.len() > 254 || !email.validate_email() {
        return Err(AppError::validation(format!("Invalid email address: '{raw}'")));
    }
    Ok(email)
}

/// Creates accounts and applies credential and status changes.
#[derive(Debug, Clone)]
pub struct AccountService {
    store: Store,
    hasher: Arc<dyn CredentialHasher>,
    validator: PasswordValidator,
    tokens: TokenService,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
    max_update_retries: u32,
}

impl AccountService {
    /// Creates the service.
    pub fn new(
        auth: &AuthConfig,
        lockout: &LockoutConfig,
        store: Store,
        hasher: Arc<dyn CredentialHasher>,
        tokens: TokenService,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            store,
            hasher,
            validator: PasswordValidator::new(auth),
            tokens,
            clock,
            sink,
            max_update_retries: lockout.max_update_retries,
        }
    }

    /// Registers a new active account.
    ///
    /// Fails with `Validation` for a malformed email or weak password and
    /// `Conflict` if a live account already owns the email.
    pub async fn register(&self, email: &str, password: &str) -> AppResult<AccountId> {
        let email = parse_email(email)?;
        self.validator.validate(password, &[email.as_str()])?;

        let digest = self.hasher.hash(password)?;
        let account = Account::new(email, digest, self.clock.now());
        self.store
            .bounded("account.insert", self.store.accounts().insert(&account))
            .await?;

        info!(account_id = %account.id, "Account registered");
        Ok(account.id)
    }

    /// Looks up an account by id.
    pub async fn get(&self, account_id: AccountId) -> AppResult<Account> {
        self.store
            .bounded("account.find_by_id", self.store.accounts().find_by_id(account_id))
            .await?
            .ok_or_else(|| AppError::not_found(format!("Account {account_id} not found")))
    }

    /// Looks up the live account owning an email.
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        self.store
            .bounded(
                "account.find_by_email",
                self.store.accounts().find_by_email(&normalize_email(email)),
            )
            .await
    }

    /// Replaces the password after verifying the current one, then revokes
    /// every refresh lineage of the account.
    pub async fn change_password(
        &self,
        account_id: AccountId,
        current_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        let account = self.get(account_id).await?;
        if account.is_deleted() {
            return Err(AppError::not_found(format!("Account {account_id} not found")));
        }
        if !self.hasher.verify(current_password, &account.password_hash)? {
            info!(account_id = %account_id, "Password change refused: current password mismatch");
            return Err(AppError::invalid_credentials("Current password mismatch"));
        }
        self.validator.validate_not_same(current_password, new_password)?;
        self.validator
            .validate(new_password, &[account.email.as_str()])?;

        let digest = self.hasher.hash(new_password)?;
        let now = self.clock.now();
        update_account(&self.store, account_id, self.max_update_retries, |current| {
            Ok(Some(current.with_password_hash(digest.clone(), now)))
        })
        .await?;

        self.tokens
            .revoke_all_for_account(account_id, "password changed")
            .await?;
        self.sink
            .publish(DomainEvent::security(
                now,
                Some(account_id.into_uuid()),
                SecurityEvent::PasswordChanged {
                    account_id: account_id.into_uuid(),
                },
            ))
            .await;

        info!(account_id = %account_id, "Password changed");
        Ok(())
    }

    /// Moves an account to `status`.
    ///
    /// Suspension and deletion revoke every refresh lineage. A deleted
    /// account cannot be revived.
    pub async fn set_status(&self, account_id: AccountId, status: AccountStatus) -> AppResult<Account> {
        let now = self.clock.now();
        let updated = update_account(&self.store, account_id, self.max_update_retries, |current| {
            if current.is_deleted() && status != AccountStatus::Deleted {
                return Err(AppError::conflict(format!(
                    "Account {account_id} is deleted"
                )));
            }
            if current.status == status {
                return Ok(None);
            }
            Ok(Some(current.with_status(status, now)))
        })
        .await?;

        let account = match updated {
            Some(account) => account,
            None => self.get(account_id).await?,
        };

        if matches!(status, AccountStatus::Suspended | AccountStatus::Deleted) {
            self.tokens
                .revoke_all_for_account(account_id, &format!("account {status}"))
                .await?;
        }

        info!(account_id = %account_id, status = %status, "Account status changed");
        Ok(account)
    }
}
