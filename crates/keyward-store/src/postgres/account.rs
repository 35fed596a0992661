use async_trait::async_trait;

use keyward_core::result::AppResult;
use keyward_core::types::AccountId;
use keyward_entity::account::Account;

use super::PgStore;
use super::error::db_err;
use crate::traits::AccountStore;

#[async_trait]
impl AccountStore for PgStore {
    async fn insert(&self, account: &Account) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO accounts (id, email, password_hash, status, failed_attempts, \
             last_failed_at, locked_until, version, created_at, updated_at, deleted_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(account.id)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.status)
        .bind(account.failed_attempts)
        .bind(account.last_failed_at)
        .bind(account.locked_until)
        .bind(account.version)
        .bind(account.created_at)
        .bind(account.updated_at)
        .bind(account.deleted_at)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to insert account"))?;
        Ok(())
    }

    async fn find_by_id(&self, id: AccountId) -> AppResult<Option<Account>> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find account"))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        sqlx::query_as::<_, Account>(
            "SELECT * FROM accounts WHERE email = $1 AND deleted_at IS NULL",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to find account by email"))
    }

    async fn compare_and_swap(&self, updated: &Account, expected_version: i64) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE accounts SET email = $2, password_hash = $3, status = $4, \
             failed_attempts = $5, last_failed_at = $6, locked_until = $7, version = $8, \
             updated_at = $9, deleted_at = $10 \
             WHERE id = $1 AND version = $11",
        )
        .bind(updated.id)
        .bind(&updated.email)
        .bind(&updated.password_hash)
        .bind(updated.status)
        .bind(updated.failed_attempts)
        .bind(updated.last_failed_at)
        .bind(updated.locked_until)
        .bind(updated.version)
        .bind(updated.updated_at)
        .bind(updated.deleted_at)
        .bind(expected_version)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to update account"))?;
        Ok(result.rows_affected() == 1)
    }
}
