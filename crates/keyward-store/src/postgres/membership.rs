use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Postgres;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;

use keyward_core::result::AppResult;
use keyward_core::types::{AccountId, WorkspaceId};
use keyward_entity::membership::{MemberRole, Membership};

use super::PgStore;
use super::error::db_err;
use crate::traits::{MembershipStore, MembershipWrite};

pub(super) fn insert_membership(membership: &Membership) -> Query<'_, Postgres, PgArguments> {
    sqlx::query(
        "INSERT INTO memberships (id, workspace_id, user_id, role, joined_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(membership.id)
    .bind(membership.workspace_id)
    .bind(membership.user_id)
    .bind(membership.role)
    .bind(membership.joined_at)
    .bind(membership.updated_at)
}

/// Decision for a guarded write given the locked rows.
fn guard(
    locked: &[Membership],
    user_id: AccountId,
    expected: MemberRole,
    keeps_owner: bool,
) -> Result<Membership, MembershipWrite> {
    let current = locked
        .iter()
        .find(|m| m.user_id == user_id)
        .cloned()
        .ok_or(MembershipWrite::Missing)?;
    if current.role != expected {
        return Err(MembershipWrite::Stale);
    }
    let owners = locked.iter().filter(|m| m.role.is_owner()).count();
    if current.role.is_owner() && !keeps_owner && owners <= 1 {
        return Err(MembershipWrite::LastOwner);
    }
    Ok(current)
}

const LOCK_TARGET_AND_OWNERS: &str = "SELECT * FROM memberships \
     WHERE workspace_id = $1 AND (role = 'owner' OR user_id = $2) \
     ORDER BY id FOR UPDATE";

#[async_trait]
impl MembershipStore for PgStore {
    async fn insert(&self, membership: &Membership) -> AppResult<()> {
        insert_membership(membership)
            .execute(&self.pool)
            .await
            .map_err(db_err("Failed to insert membership"))?;
        Ok(())
    }

    async fn find(
        &self,
        workspace_id: WorkspaceId,
        user_id: AccountId,
    ) -> AppResult<Option<Membership>> {
        sqlx::query_as::<_, Membership>(
            "SELECT * FROM memberships WHERE workspace_id = $1 AND user_id = $2",
        )
        .bind(workspace_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to find membership"))
    }

    async fn list_by_workspace(&self, workspace_id: WorkspaceId) -> AppResult<Vec<Membership>> {
        sqlx::query_as::<_, Membership>(
            "SELECT * FROM memberships WHERE workspace_id = $1 ORDER BY joined_at, id",
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list workspace members"))
    }

    async fn list_by_user(&self, user_id: AccountId) -> AppResult<Vec<Membership>> {
        sqlx::query_as::<_, Membership>(
            "SELECT * FROM memberships WHERE user_id = $1 ORDER BY joined_at, id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list user memberships"))
    }

    async fn change_role(
        &self,
        workspace_id: WorkspaceId,
        user_id: AccountId,
        expected: MemberRole,
        new_role: MemberRole,
        now: DateTime<Utc>,
    ) -> AppResult<MembershipWrite> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin role change"))?;

        let locked = sqlx::query_as::<_, Membership>(LOCK_TARGET_AND_OWNERS)
            .bind(workspace_id)
            .bind(user_id)
            .fetch_all(&mut *tx)
            .await
            .map_err(db_err("Failed to lock memberships"))?;

        let current = match guard(&locked, user_id, expected, new_role.is_owner()) {
            Ok(current) => current,
            Err(outcome) => {
                tx.rollback()
                    .await
                    .map_err(db_err("Failed to roll back role change"))?;
                return Ok(outcome);
            }
        };

        sqlx::query(
            "UPDATE memberships SET role = $3, updated_at = $4 \
             WHERE workspace_id = $1 AND user_id = $2",
        )
        .bind(workspace_id)
        .bind(user_id)
        .bind(new_role)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to change role"))?;

        tx.commit()
            .await
            .map_err(db_err("Failed to commit role change"))?;
        Ok(MembershipWrite::Applied(current))
    }

    async fn remove(
        &self,
        workspace_id: WorkspaceId,
        user_id: AccountId,
        expected: MemberRole,
    ) -> AppResult<MembershipWrite> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin member removal"))?;

        let locked = sqlx::query_as::<_, Membership>(LOCK_TARGET_AND_OWNERS)
            .bind(workspace_id)
            .bind(user_id)
            .fetch_all(&mut *tx)
            .await
            .map_err(db_err("Failed to lock memberships"))?;

        let current = match guard(&locked, user_id, expected, false) {
            Ok(current) => current,
            Err(outcome) => {
                tx.rollback()
                    .await
                    .map_err(db_err("Failed to roll back member removal"))?;
                return Ok(outcome);
            }
        };

        sqlx::query("DELETE FROM memberships WHERE workspace_id = $1 AND user_id = $2")
            .bind(workspace_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to remove member"))?;

        tx.commit()
            .await
            .map_err(db_err("Failed to commit member removal"))?;
        Ok(MembershipWrite::Applied(current))
    }
}
