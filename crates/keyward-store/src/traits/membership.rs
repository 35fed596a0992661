//! Membership persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use keyward_core::result::AppResult;
use keyward_core::types::{AccountId, WorkspaceId};
use keyward_entity::membership::{MemberRole, Membership};

/// Result of a guarded membership write.
#[derive(Debug, Clone, PartialEq)]
pub enum MembershipWrite {
    /// The write happened; carries the membership as it was before.
    Applied(Membership),
    /// No membership exists for the pair.
    Missing,
    /// The stored role no longer matches the expected role.
    Stale,
    /// The write would leave the workspace without an owner.
    LastOwner,
}

/// Stores (workspace, user) role bindings.
#[async_trait]
pub trait MembershipStore: Send + Sync + std::fmt::Debug + 'static {
    /// Inserts a membership. Fails with `Conflict` if the pair already exists.
    async fn insert(&self, membership: &Membership) -> AppResult<()>;

    /// Looks up the membership of one user in one workspace.
    async fn find(
        &self,
        workspace_id: WorkspaceId,
        user_id: AccountId,
    ) -> AppResult<Option<Membership>>;

    /// Lists memberships of a workspace, oldest first.
    async fn list_by_workspace(&self, workspace_id: WorkspaceId) -> AppResult<Vec<Membership>>;

    /// Lists memberships of a user, oldest first.
    async fn list_by_user(&self, user_id: AccountId) -> AppResult<Vec<Membership>>;

    /// Changes a role if the stored role still equals `expected` and the
    /// change does not demote the last owner.
    async fn change_role(
        &self,
        workspace_id: WorkspaceId,
        user_id: AccountId,
        expected: MemberRole,
        new_role: MemberRole,
        now: DateTime<Utc>,
    ) -> AppResult<MembershipWrite>;

    /// Removes a membership if the stored role still equals `expected` and
    /// the removal does not drop the last owner.
    async fn remove(
        &self,
        workspace_id: WorkspaceId,
        user_id: AccountId,
        expected: MemberRole,
    ) -> AppResult<MembershipWrite>;
}
