//! RBAC enforcement: capability checks plus role-grant rules.

use keyward_core::error::AppError;
use keyward_core::result::AppResult;
use keyward_entity::membership::MemberRole;

use super::policies::{Capability, RbacPolicies};

/// Enforces workspace capabilities and who may grant or remove which role.
#[derive(Debug, Clone, Default)]
pub struct RbacEnforcer {
    policies: RbacPolicies,
}

impl RbacEnforcer {
    /// Creates a new enforcer with the default policy set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an enforcer with custom policies.
    pub fn with_policies(policies: RbacPolicies) -> Self {
        Self { policies }
    }

    /// Checks whether the role holds the capability (returns bool).
    pub fn has_permission(&self, role: MemberRole, capability: Capability) -> bool {
        self.policies.has_permission(role, capability)
    }

    /// Returns `Ok(())` if allowed, or a `Forbidden` error if denied.
    pub fn require_permission(&self, role: MemberRole, capability: Capability) -> AppResult<()> {
        if self.has_permission(role, capability) {
            Ok(())
        } else {
            Err(AppError::forbidden(format!(
                "Role '{role}' does not have permission '{capability}'"
            )))
        }
    }

    /// An actor may never grant a role above their own.
    pub fn require_grantable(&self, actor: MemberRole, granted: MemberRole) -> AppResult<()> {
        if actor.has_at_least(&granted) {
            Ok(())
        } else {
            Err(AppError::forbidden(format!(
                "Role '{actor}' cannot grant role '{granted}'"
            )))
        }
    }

    /// Owners may remove anyone; admins only members and guests.
    pub fn require_removable(&self, actor: MemberRole, target: MemberRole) -> AppResult<()> {
        self.require_permission(actor, Capability::RemoveMembers)?;
        if actor.is_owner() || actor.outranks(&target) {
            Ok(())
        } else {
            Err(AppError::forbidden(format!(
                "Role '{actor}' cannot remove a member with role '{target}'"
            )))
        }
    }

    /// Returns a reference to the underlying policies.
    pub fn policies(&self) -> &RbacPolicies {
        &self.policies
    }
}
