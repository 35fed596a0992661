use async_trait::async_trait;
use chrono::{DateTime, Utc};

use keyward_core::error::AppError;
use keyward_core::result::AppResult;
use keyward_core::types::{InvitationId, WorkspaceId};
use keyward_entity::invitation::Invitation;
use keyward_entity::membership::Membership;

use super::PgStore;
use super::error::db_err;
use crate::traits::{AcceptOutcome, InvitationStore};

#[async_trait]
impl InvitationStore for PgStore {
    async fn insert_pending(&self, invitation: &Invitation, now: DateTime<Utc>) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin invitation insert"))?;

        sqlx::query(
            "UPDATE invitations SET status = 'expired' \
             WHERE workspace_id = $1 AND email = $2 AND status = 'pending' AND expires_at <= $3",
        )
        .bind(invitation.workspace_id)
        .bind(&invitation.email)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to expire stale invitations"))?;

        // uq_invitations_pending rejects a second live pending row.
        sqlx::query(
            "INSERT INTO invitations (id, workspace_id, email, role, inviter_id, token_hash, \
             status, created_at, expires_at, accepted_at, accepted_by, cancelled_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(invitation.id)
        .bind(invitation.workspace_id)
        .bind(&invitation.email)
        .bind(invitation.role)
        .bind(invitation.inviter_id)
        .bind(&invitation.token_hash)
        .bind(invitation.status)
        .bind(invitation.created_at)
        .bind(invitation.expires_at)
        .bind(invitation.accepted_at)
        .bind(invitation.accepted_by)
        .bind(invitation.cancelled_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to insert invitation"))?;

        tx.commit()
            .await
            .map_err(db_err("Failed to commit invitation insert"))
    }

    async fn find_by_hash(&self, token_hash: &str) -> AppResult<Option<Invitation>> {
        sqlx::query_as::<_, Invitation>("SELECT * FROM invitations WHERE token_hash = $1")
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find invitation"))
    }

    async fn find_by_id(&self, id: InvitationId) -> AppResult<Option<Invitation>> {
        sqlx::query_as::<_, Invitation>("SELECT * FROM invitations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find invitation"))
    }

    async fn transition(&self, updated: &Invitation) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE invitations SET status = $2, accepted_at = $3, accepted_by = $4, \
             cancelled_at = $5 WHERE id = $1 AND status = 'pending'",
        )
        .bind(updated.id)
        .bind(updated.status)
        .bind(updated.accepted_at)
        .bind(updated.accepted_by)
        .bind(updated.cancelled_at)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to transition invitation"))?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }
        match InvitationStore::find_by_id(self, updated.id).await? {
            Some(_) => Ok(false),
            None => Err(AppError::not_found(format!(
                "Invitation {} not found",
                updated.id
            ))),
        }
    }

    async fn accept(
        &self,
        accepted: &Invitation,
        membership: &Membership,
    ) -> AppResult<AcceptOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin invitation accept"))?;

        let workspace_active = sqlx::query_scalar::<_, i32>(
            "SELECT 1 FROM workspaces \
             WHERE id = $1 AND status = 'active' AND deleted_at IS NULL \
             FOR SHARE",
        )
        .bind(membership.workspace_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err("Failed to lock workspace"))?
        .is_some();

        if !workspace_active {
            tx.rollback()
                .await
                .map_err(db_err("Failed to roll back invitation accept"))?;
            return Ok(AcceptOutcome::WorkspaceInactive);
        }

        let claimed = sqlx::query(
            "UPDATE invitations SET status = 'accepted', accepted_at = $2, accepted_by = $3 \
             WHERE id = $1 AND status = 'pending'",
        )
        .bind(accepted.id)
        .bind(accepted.accepted_at)
        .bind(accepted.accepted_by)
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to accept invitation"))?;

        if claimed.rows_affected() != 1 {
            tx.rollback()
                .await
                .map_err(db_err("Failed to roll back invitation accept"))?;
            return Ok(AcceptOutcome::NotPending);
        }

        let joined = sqlx::query(
            "INSERT INTO memberships (id, workspace_id, user_id, role, joined_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (workspace_id, user_id) DO NOTHING",
        )
        .bind(membership.id)
        .bind(membership.workspace_id)
        .bind(membership.user_id)
        .bind(membership.role)
        .bind(membership.joined_at)
        .bind(membership.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to insert membership"))?;

        if joined.rows_affected() != 1 {
            tx.rollback()
                .await
                .map_err(db_err("Failed to roll back invitation accept"))?;
            return Ok(AcceptOutcome::AlreadyMember);
        }

        tx.commit()
            .await
            .map_err(db_err("Failed to commit invitation accept"))?;
        Ok(AcceptOutcome::Accepted)
    }

    async fn list_pending(&self, workspace_id: WorkspaceId) -> AppResult<Vec<Invitation>> {
        sqlx::query_as::<_, Invitation>(
            "SELECT * FROM invitations WHERE workspace_id = $1 AND status = 'pending' \
             ORDER BY created_at, id",
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list pending invitations"))
    }

    async fn expire_stale(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE invitations SET status = 'expired' \
             WHERE status = 'pending' AND expires_at <= $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to expire invitations"))?;
        Ok(result.rows_affected())
    }
}
