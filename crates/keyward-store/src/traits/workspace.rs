//! Workspace persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use keyward_core::result::AppResult;
use keyward_core::types::WorkspaceId;
use keyward_entity::membership::Membership;
use keyward_entity::workspace::Workspace;

/// Durable workspace records.
#[async_trait]
pub trait WorkspaceStore: Send + Sync + std::fmt::Debug + 'static {
    /// Stores a workspace together with its owner membership in one step.
    ///
    /// Fails with `Conflict` if the slug is taken; neither record is written.
    async fn create_with_owner(&self, workspace: &Workspace, owner: &Membership) -> AppResult<()>;

    /// Looks up a workspace by id.
    async fn find_by_id(&self, id: WorkspaceId) -> AppResult<Option<Workspace>>;

    /// Renames the workspace only while it is active.
    ///
    /// Returns the stored record, or `None` if the workspace is missing or
    /// no longer active.
    async fn rename(
        &self,
        id: WorkspaceId,
        name: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Workspace>>;

    /// Archives (soft-deletes) the workspace only while it is active.
    ///
    /// Returns `None` if the workspace is missing or already archived.
    async fn archive(&self, id: WorkspaceId, now: DateTime<Utc>) -> AppResult<Option<Workspace>>;
}
