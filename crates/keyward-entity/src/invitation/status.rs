//! Invitation status enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of an invitation in its lifecycle.
///
/// `Pending` is the only state with outgoing transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invitation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    /// Waiting to be redeemed.
    Pending,
    /// Redeemed; a membership exists.
    Accepted,
    /// Expiry elapsed before redemption.
    Expired,
    /// Withdrawn by an administrator.
    Cancelled,
}

impl InvitationStatus {
    /// Whether no further transition is allowed.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
