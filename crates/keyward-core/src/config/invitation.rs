//! Invitation configuration.

use serde::{Deserialize, Serialize};

/// Invitation lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationConfig {
    /// Days until a pending invitation expires.
    #[serde(default = "default_ttl_days")]
    pub ttl_days: u64,
}

impl Default for InvitationConfig {
    fn default() -> Self {
        Self {
            ttl_days: default_ttl_days(),
        }
    }
}

fn default_ttl_days() -> u64 {
    7
}
