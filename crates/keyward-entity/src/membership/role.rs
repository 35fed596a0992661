//! Workspace role enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Roles a member can hold inside one workspace.
///
/// Roles are ordered by privilege level: Owner > Admin > Member > Guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "member_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    /// Full control, including deletion and role changes.
    Owner,
    /// Manages members and settings.
    Admin,
    /// Writes content.
    Member,
    /// Read-only.
    Guest,
}

impl MemberRole {
    /// Every role, highest privilege first.
    pub const ALL: [MemberRole; 4] = [Self::Owner, Self::Admin, Self::Member, Self::Guest];

    /// Return the privilege level (higher = more privileged).
    pub fn privilege_level(&self) -> u8 {
        match self {
            Self::Owner => 4,
            Self::Admin => 3,
            Self::Member => 2,
            Self::Guest => 1,
        }
    }

    /// Check if this role has at least the given role's privileges.
    pub fn has_at_least(&self, other: &MemberRole) -> bool {
        self.privilege_level() >= other.privilege_level()
    }

    /// Check if this role is strictly above the other.
    pub fn outranks(&self, other: &MemberRole) -> bool {
        self.privilege_level() > other.privilege_level()
    }

    /// Check if this role is the owner role.
    pub fn is_owner(&self) -> bool {
        matches!(self, Self::Owner)
    }

    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
            Self::Guest => "guest",
        }
    }
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MemberRole {
    type Err = keyward_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "owner" => Ok(Self::Owner),
            "admin" => Ok(Self::Admin),
            "member" => Ok(Self::Member),
            "guest" => Ok(Self::Guest),
            _ => Err(keyward_core::AppError::validation(format!(
                "Invalid member role: '{s}'. Expected one of: owner, admin, member, guest"
            ))),
        }
    }
}
