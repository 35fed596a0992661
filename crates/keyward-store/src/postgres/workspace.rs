use async_trait::async_trait;
use chrono::{DateTime, Utc};

use keyward_core::result::AppResult;
use keyward_core::types::WorkspaceId;
use keyward_entity::membership::Membership;
use keyward_entity::workspace::Workspace;

use super::PgStore;
use super::error::db_err;
use super::membership::insert_membership;
use crate::traits::WorkspaceStore;

#[async_trait]
impl WorkspaceStore for PgStore {
    async fn create_with_owner(&self, workspace: &Workspace, owner: &Membership) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_err("Failed to begin workspace creation"))?;

        sqlx::query(
            "INSERT INTO workspaces (id, name, slug, owner_id, status, created_at, updated_at, deleted_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(workspace.id)
        .bind(&workspace.name)
        .bind(&workspace.slug)
        .bind(workspace.owner_id)
        .bind(workspace.status)
        .bind(workspace.created_at)
        .bind(workspace.updated_at)
        .bind(workspace.deleted_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err("Failed to insert workspace"))?;

        insert_membership(owner)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to insert owner membership"))?;

        tx.commit()
            .await
            .map_err(db_err("Failed to commit workspace creation"))
    }

    async fn find_by_id(&self, id: WorkspaceId) -> AppResult<Option<Workspace>> {
        sqlx::query_as::<_, Workspace>("SELECT * FROM workspaces WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to find workspace"))
    }

    async fn rename(
        &self,
        id: WorkspaceId,
        name: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Workspace>> {
        sqlx::query_as::<_, Workspace>(
            "UPDATE workspaces SET name = $2, updated_at = $3 \
             WHERE id = $1 AND status = 'active' AND deleted_at IS NULL \
             RETURNING *",
        )
        .bind(id)
        .bind(name)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to rename workspace"))
    }

    async fn archive(&self, id: WorkspaceId, now: DateTime<Utc>) -> AppResult<Option<Workspace>> {
        sqlx::query_as::<_, Workspace>(
            "UPDATE workspaces SET status = 'archived', deleted_at = $2, updated_at = $2 \
             WHERE id = $1 AND status = 'active' AND deleted_at IS NULL \
             RETURNING *",
        )
        .bind(id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to archive workspace"))
    }
}
