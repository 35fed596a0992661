//! Credential and token security events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events raised by the lockout guard and token service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SecurityEvent {
    /// An account crossed the failure threshold and was locked.
    AccountLocked {
        /// The account ID.
        account_id: Uuid,
        /// Consecutive failures that triggered the lock.
        failed_attempts: u32,
        /// When the lock lifts.
        locked_until: DateTime<Utc>,
    },
    /// A superseded or revoked refresh token was presented; its lineage was revoked.
    TokenReuseDetected {
        /// Owner of the lineage.
        account_id: Uuid,
        /// The revoked lineage.
        lineage_id: Uuid,
        /// The record whose token was replayed.
        record_id: Uuid,
        /// Number of records revoked as a consequence.
        revoked_records: u64,
    },
    /// Every lineage of an account was revoked (password change, suspension).
    SessionsRevoked {
        /// The account ID.
        account_id: Uuid,
        /// Why the sessions were revoked.
        reason: String,
    },
    /// An account password was changed.
    PasswordChanged {
        /// The account ID.
        account_id: Uuid,
    },
}
