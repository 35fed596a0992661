//! Account persistence.

use async_trait::async_trait;

use keyward_core::result::AppResult;
use keyward_core::types::AccountId;
use keyward_entity::account::Account;

/// Durable record of account identity, digest, status and lockout state.
#[async_trait]
pub trait AccountStore: Send + Sync + std::fmt::Debug + 'static {
    /// Inserts a new account.
    ///
    /// Fails with `Conflict` if a non-deleted account already owns the email.
    async fn insert(&self, account: &Account) -> AppResult<()>;

    /// Looks up an account by id, including soft-deleted ones.
    async fn find_by_id(&self, id: AccountId) -> AppResult<Option<Account>>;

    /// Looks up the non-deleted account owning a normalised email.
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>>;

    /// Replaces the stored account with `updated` only if the stored version
    /// still equals `expected_version`. Returns `false` when another writer
    /// got there first.
    async fn compare_and_swap(&self, updated: &Account, expected_version: i64) -> AppResult<bool>;
}
