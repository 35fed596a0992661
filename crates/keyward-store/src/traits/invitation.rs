//! Invitation persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use keyward_core::result::AppResult;
use keyward_core::types::{InvitationId, WorkspaceId};
use keyward_entity::invitation::Invitation;
use keyward_entity::membership::Membership;

/// Result of redeeming an invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// Invitation marked accepted and membership created.
    Accepted,
    /// The invitation was not pending any more; nothing was written.
    NotPending,
    /// The user already belongs to the workspace; nothing was written.
    AlreadyMember,
    /// The workspace is missing or no longer active; nothing was written.
    WorkspaceInactive,
}

/// Stores invitations and runs their state transitions.
#[async_trait]
pub trait InvitationStore: Send + Sync + std::fmt::Debug + 'static {
    /// Stores a pending invitation.
    ///
    /// Pending invitations for the same (workspace, email) whose expiry has
    /// passed at `now` are first marked expired. Fails with `Conflict` if a
    /// live pending invitation remains for the pair.
    async fn insert_pending(&self, invitation: &Invitation, now: DateTime<Utc>) -> AppResult<()>;

    /// Looks up an invitation by the hash of its token.
    async fn find_by_hash(&self, token_hash: &str) -> AppResult<Option<Invitation>>;

    /// Looks up an invitation by id.
    async fn find_by_id(&self, id: InvitationId) -> AppResult<Option<Invitation>>;

    /// Writes `updated` only if the stored invitation is still pending.
    async fn transition(&self, updated: &Invitation) -> AppResult<bool>;

    /// Marks the invitation accepted and creates the membership as one step.
    ///
    /// The workspace must be active at the moment of the write.
    async fn accept(&self, accepted: &Invitation, membership: &Membership)
    -> AppResult<AcceptOutcome>;

    /// Lists invitations of a workspace still stored as pending.
    async fn list_pending(&self, workspace_id: WorkspaceId) -> AppResult<Vec<Invitation>>;

    /// Marks every pending invitation whose expiry has passed as expired.
    async fn expire_stale(&self, now: DateTime<Utc>) -> AppResult<u64>;
}
