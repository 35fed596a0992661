//! Refresh-token record.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use keyward_core::types::{AccountId, LineageId, RefreshTokenId, WorkspaceId};

use super::status::RefreshTokenStatus;

/// One issued refresh token.
///
/// Only the SHA-256 hash of the opaque token value is kept. Records are never
/// deleted while they may still be replayed; the purge job removes them only
/// after a retention period past expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RefreshTokenRecord {
    /// Record identifier.
    pub id: RefreshTokenId,
    /// The lineage this record belongs to.
    pub lineage_id: LineageId,
    /// Owning account.
    pub account_id: AccountId,
    /// Workspace scope carried into reissued access tokens.
    pub workspace_id: Option<WorkspaceId>,
    /// Hex SHA-256 of the token value.
    #[serde(skip_serializing)]
    pub token_hash: String,
    /// State machine position.
    pub status: RefreshTokenStatus,
    /// When the token was issued.
    pub issued_at: DateTime<Utc>,
    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,
    /// The record that replaced this one on rotation.
    pub superseded_by: Option<RefreshTokenId>,
    /// When the record was revoked.
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshTokenRecord {
    /// Builds the root record of a new lineage.
    pub fn root(
        account_id: AccountId,
        workspace_id: Option<WorkspaceId>,
        token_hash: impl Into<String>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            id: RefreshTokenId::new(),
            lineage_id: LineageId::new(),
            account_id,
            workspace_id,
            token_hash: token_hash.into(),
            status: RefreshTokenStatus::Active,
            issued_at: now,
            expires_at: now + ttl,
            superseded_by: None,
            revoked_at: None,
        }
    }

    /// Builds the record that replaces this one in the same lineage.
    pub fn successor(&self, token_hash: impl Into<String>, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            id: RefreshTokenId::new(),
            lineage_id: self.lineage_id,
            account_id: self.account_id,
            workspace_id: self.workspace_id,
            token_hash: token_hash.into(),
            status: RefreshTokenStatus::Active,
            issued_at: now,
            expires_at: now + ttl,
            superseded_by: None,
            revoked_at: None,
        }
    }

    /// Returns a copy marked as replaced by `successor`.
    pub fn superseded_by(&self, successor: RefreshTokenId) -> Self {
        Self {
            status: RefreshTokenStatus::Superseded,
            superseded_by: Some(successor),
            ..self.clone()
        }
    }

    /// Returns a copy marked revoked at `now`.
    pub fn revoked(&self, now: DateTime<Utc>) -> Self {
        Self {
            status: RefreshTokenStatus::Revoked,
            revoked_at: Some(now),
            ..self.clone()
        }
    }

    /// Whether this is the usable record of its lineage.
    pub fn is_active(&self) -> bool {
        self.status == RefreshTokenStatus::Active
    }

    /// Whether the token is past its expiry at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
