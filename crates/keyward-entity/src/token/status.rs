//! Refresh-token record status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a record in its lineage state machine.
///
/// `Active` moves to `Superseded` on rotation or to `Revoked` on logout or
/// reuse detection. Both are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "refresh_token_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RefreshTokenStatus {
    /// The single usable record of its lineage.
    Active,
    /// Rotated; presenting it again is a reuse event.
    Superseded,
    /// Explicitly invalidated.
    Revoked,
}

impl RefreshTokenStatus {
    /// Whether the status can no longer change.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Superseded => "superseded",
            Self::Revoked => "revoked",
        }
    }
}

impl fmt::Display for RefreshTokenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
