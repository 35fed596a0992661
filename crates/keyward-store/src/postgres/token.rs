use async_trait::async_trait;
use chrono::{DateTime, Utc};

use keyward_core::result::AppResult;
use keyward_core::types::{AccountId, LineageId, RefreshTokenId};
use keyward_entity::token::RefreshTokenRecord;

use super::PgStore;
use super::error::db_err;
use crate::traits::{RefreshTokenStore, RotateOutcome};

const INSERT_RECORD: &str = "INSERT INTO refresh_tokens (id, lineage_id, account_id, \
     workspace_id, token_hash, status, issued_at, expires_at, superseded_by, revoked_at) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)";

fn insert_query(
    record: &RefreshTokenRecord,
) -> sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments> {
    sqlx::query(INSERT_RECORD)
        .bind(record.id)
        .bind(record.lineage_id)
        .bind(record.account_id)
        .bind(record.workspace_id)
        .bind(&record.token_hash)
        .bind(record.status)
        .bind(record.issued_at)
        .bind(record.expires_at)
        .bind(record.superseded_by)
        .bind(record.revoked_at)
}

#[async_trait]
impl RefreshTokenStore for PgStore {
    async fn insert(&self, record: &RefreshTokenRecord) -> AppResult<()> {
        insert_query(record)
            .execute(&self.pool)
            .await
            .map_err(db_err("Failed to insert refresh token"))?;
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> AppResult<Option<RefreshTokenRecord>> {
        sqlx::query_as::<_, RefreshTokenRecord>(
            "SELECT * FROM refresh_tokens WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to find refresh token"))
    }

    async fn rotate(
        &self,
        current: RefreshTokenId,
        successor: &RefreshTokenRecord,
    ) -> AppResult<RotateOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin rotation"))?;

        let superseded = sqlx::query(
            "UPDATE refresh_tokens SET status = 'superseded', superseded_by = $2 \
             WHERE id = $1 AND status = 'active'",
        )
        .bind(current)
        .bind(successor.id)
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to supersede refresh token"))?;

        if superseded.rows_affected() != 1 {
            tx.rollback()
                .await
                .map_err(db_err("Failed to roll back rotation"))?;
            return Ok(RotateOutcome::NotActive);
        }

        insert_query(successor)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to insert successor token"))?;

        tx.commit()
            .await
            .map_err(db_err("Failed to commit rotation"))?;
        Ok(RotateOutcome::Rotated)
    }

    async fn revoke_lineage(&self, lineage_id: LineageId, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET status = 'revoked', revoked_at = $2 \
             WHERE lineage_id = $1 AND status = 'active'",
        )
        .bind(lineage_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to revoke lineage"))?;
        Ok(result.rows_affected())
    }

    async fn revoke_all_for_account(
        &self,
        account_id: AccountId,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET status = 'revoked', revoked_at = $2 \
             WHERE account_id = $1 AND status = 'active'",
        )
        .bind(account_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to revoke account tokens"))?;
        Ok(result.rows_affected())
    }

    async fn lineage_is_active(&self, lineage_id: LineageId) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM refresh_tokens \
             WHERE lineage_id = $1 AND status = 'active')",
        )
        .bind(lineage_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err("Failed to check lineage"))
    }

    async fn purge_expired_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(db_err("Failed to purge refresh tokens"))?;
        Ok(result.rows_affected())
    }
}
