//! Membership entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use keyward_core::types::{AccountId, MembershipId, WorkspaceId};

use super::role::MemberRole;

/// Binds one account to one workspace with a role.
///
/// `(workspace_id, user_id)` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Membership {
    /// Membership identifier.
    pub id: MembershipId,
    /// The workspace.
    pub workspace_id: WorkspaceId,
    /// The member account.
    pub user_id: AccountId,
    /// The member's role in this workspace.
    pub role: MemberRole,
    /// When the account joined.
    pub joined_at: DateTime<Utc>,
    /// When the role last changed.
    pub updated_at: DateTime<Utc>,
}

impl Membership {
    /// Builds a new membership.
    pub fn new(
        workspace_id: WorkspaceId,
        user_id: AccountId,
        role: MemberRole,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MembershipId::new(),
            workspace_id,
            user_id,
            role,
            joined_at: now,
            updated_at: now,
        }
    }

    /// Returns a copy holding `role`.
    pub fn with_role(&self, role: MemberRole, now: DateTime<Utc>) -> Self {
        Self {
            role,
            updated_at: now,
            ..self.clone()
        }
    }
}
