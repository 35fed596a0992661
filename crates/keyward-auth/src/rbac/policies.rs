//! Capability-to-role mapping.
//!
//! Each capability names the least privileged role allowed to use it, and a
//! role holds every capability whose minimum it meets. A higher role
//! therefore always holds everything a lower role holds.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use keyward_entity::membership::MemberRole;

/// An action a member may take inside a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Read workspace content.
    ReadContent,
    /// Create or modify workspace content.
    WriteContent,
    /// Send invitations and add members directly.
    InviteMembers,
    /// Remove other members.
    RemoveMembers,
    /// Rename or reconfigure the workspace.
    EditWorkspace,
    /// Delete the workspace.
    DeleteWorkspace,
    /// Change another member's role.
    ChangeMemberRole,
}

impl Capability {
    /// Every capability.
    pub const ALL: [Capability; 7] = [
        Self::ReadContent,
        Self::WriteContent,
        Self::InviteMembers,
        Self::RemoveMembers,
        Self::EditWorkspace,
        Self::DeleteWorkspace,
        Self::ChangeMemberRole,
    ];
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ReadContent => "read_content",
            Self::WriteContent => "write_content",
            Self::InviteMembers => "invite_members",
            Self::RemoveMembers => "remove_members",
            Self::EditWorkspace => "edit_workspace",
            Self::DeleteWorkspace => "delete_workspace",
            Self::ChangeMemberRole => "change_member_role",
        };
        f.write_str(name)
    }
}

/// Minimum role per capability.
#[derive(Debug, Clone)]
pub struct RbacPolicies {
    minimum: HashMap<Capability, MemberRole>,
}

impl RbacPolicies {
    /// Creates the default policy set.
    pub fn new() -> Self {
        let minimum = HashMap::from([
            (Capability::ReadContent, MemberRole::Guest),
            (Capability::WriteContent, MemberRole::Member),
            (Capability::InviteMembers, MemberRole::Admin),
            (Capability::RemoveMembers, MemberRole::Admin),
            (Capability::EditWorkspace, MemberRole::Admin),
            (Capability::DeleteWorkspace, MemberRole::Owner),
            (Capability::ChangeMemberRole, MemberRole::Owner),
        ]);
        Self { minimum }
    }

    /// The least privileged role holding `capability`.
    pub fn minimum_role(&self, capability: Capability) -> MemberRole {
        self.minimum
            .get(&capability)
            .copied()
            .unwrap_or(MemberRole::Owner)
    }

    /// Checks whether the given role holds the capability.
    pub fn has_permission(&self, role: MemberRole, capability: Capability) -> bool {
        role.has_at_least(&self.minimum_role(capability))
    }

    /// Returns the set of capabilities for the given role.
    pub fn permissions_for_role(&self, role: MemberRole) -> HashSet<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|c| self.has_permission(role, *c))
            .collect()
    }
}

impl Default for RbacPolicies {
    fn default() -> Self {
        Self::new()
    }
}
