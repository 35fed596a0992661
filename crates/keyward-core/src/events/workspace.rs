//! Workspace, membership, and invitation events.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events related to tenant administration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkspaceEvent {
    /// A workspace was created together with its owner membership.
    Created {
        /// The workspace ID.
        workspace_id: Uuid,
        /// The owning account.
        owner_id: Uuid,
        /// The unique slug.
        slug: String,
    },
    /// A workspace was renamed.
    Renamed {
        /// The workspace ID.
        workspace_id: Uuid,
        /// The new name.
        name: String,
    },
    /// A workspace was soft-deleted.
    Deleted {
        /// The workspace ID.
        workspace_id: Uuid,
    },
    /// A member joined, directly or by invitation.
    MemberAdded {
        /// The workspace ID.
        workspace_id: Uuid,
        /// The new member.
        user_id: Uuid,
        /// The granted role.
        role: String,
    },
    /// A member left or was removed.
    MemberRemoved {
        /// The workspace ID.
        workspace_id: Uuid,
        /// The removed member.
        user_id: Uuid,
    },
    /// A member's role changed.
    RoleChanged {
        /// The workspace ID.
        workspace_id: Uuid,
        /// The member.
        user_id: Uuid,
        /// The previous role.
        old_role: String,
        /// The new role.
        new_role: String,
    },
    /// An invitation was issued.
    InvitationCreated {
        /// The invitation ID.
        invitation_id: Uuid,
        /// The workspace ID.
        workspace_id: Uuid,
        /// Normalised invitee email.
        email: String,
        /// The offered role.
        role: String,
    },
    /// An invitation was redeemed.
    InvitationAccepted {
        /// The invitation ID.
        invitation_id: Uuid,
        /// The workspace ID.
        workspace_id: Uuid,
        /// The accepting account.
        user_id: Uuid,
    },
    /// A pending invitation was cancelled.
    InvitationCancelled {
        /// The invitation ID.
        invitation_id: Uuid,
        /// The workspace ID.
        workspace_id: Uuid,
    },
}
