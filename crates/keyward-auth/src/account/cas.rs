//! Optimistic-concurrency update loop for account records.

use keyward_core::error::AppError;
use keyward_core::result::AppResult;
use keyward_core::types::AccountId;
use keyward_entity::account::Account;
use keyward_store::Store;
use tracing::debug;

/// Re-reads the account and applies `change` until the version check
/// succeeds.
///
/// `change` returns `None` to leave the account untouched. Gives up with a
/// transient `Unavailable` after `max_retries` lost races; each lost race
/// means another writer succeeded, so the bound only trips under sustained
/// contention.
pub(crate) async fn update_account<F>(
    store: &Store,
    account_id: AccountId,
    max_retries: u32,
    mut change: F,
) -> AppResult<Option<Account>>
where
    F: FnMut(&Account) -> AppResult<Option<Account>>,
{
    for attempt in 0..=max_retries {
        let current = store
            .bounded("account.find_by_id", store.accounts().find_by_id(account_id))
            .await?
            .ok_or_else(|| AppError::not_found(format!("Account {account_id} not found")))?;

        let Some(updated) = change(&current)? else {
            return Ok(None);
        };

        let swapped = store
            .bounded(
                "account.compare_and_swap",
                store.accounts().compare_and_swap(&updated, current.version),
            )
            .await?;
        if swapped {
            return Ok(Some(updated));
        }
        debug!(account_id = %account_id, attempt, "Account version moved, retrying update");
    }

    Err(AppError::unavailable(format!(
        "Account {account_id} update lost {} consecutive races",
        max_retries + 1
    )))
}
