//! Invitation entity model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use keyward_core::error::AppError;
use keyward_core::result::AppResult;
use keyward_core::types::{AccountId, InvitationId, WorkspaceId};

use super::status::InvitationStatus;
use crate::membership::MemberRole;

/// An emailed offer to join a workspace with a given role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Invitation {
    /// Invitation identifier.
    pub id: InvitationId,
    /// Target workspace.
    pub workspace_id: WorkspaceId,
    /// Normalised invitee email.
    pub email: String,
    /// Role granted on acceptance.
    pub role: MemberRole,
    /// The account that sent the invitation.
    pub inviter_id: AccountId,
    /// Hex SHA-256 of the single-use token.
    #[serde(skip_serializing)]
    pub token_hash: String,
    /// Stored lifecycle status. See [`Invitation::effective_status`].
    pub status: InvitationStatus,
    /// When the invitation was created.
    pub created_at: DateTime<Utc>,
    /// When the invitation stops being redeemable.
    pub expires_at: DateTime<Utc>,
    /// When it was accepted.
    pub accepted_at: Option<DateTime<Utc>>,
    /// Who accepted it.
    pub accepted_by: Option<AccountId>,
    /// When it was cancelled.
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Invitation {
    /// Builds a pending invitation expiring `ttl` after `now`.
    pub fn new(
        workspace_id: WorkspaceId,
        email: impl Into<String>,
        role: MemberRole,
        inviter_id: AccountId,
        token_hash: impl Into<String>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            id: InvitationId::new(),
            workspace_id,
            email: email.into(),
            role,
            inviter_id,
            token_hash: token_hash.into(),
            status: InvitationStatus::Pending,
            created_at: now,
            expires_at: now + ttl,
            accepted_at: None,
            accepted_by: None,
            cancelled_at: None,
        }
    }

    /// The status as observed at `now`: a pending invitation past its expiry
    /// reads as `Expired` even before the store has been updated.
    pub fn effective_status(&self, now: DateTime<Utc>) -> InvitationStatus {
        match self.status {
            InvitationStatus::Pending if self.expires_at <= now => InvitationStatus::Expired,
            status => status,
        }
    }

    /// Whether the invitation can still be accepted or cancelled at `now`.
    pub fn is_pending_at(&self, now: DateTime<Utc>) -> bool {
        self.effective_status(now) == InvitationStatus::Pending
    }

    /// Returns the accepted copy.
    pub fn accepted(&self, user_id: AccountId, now: DateTime<Utc>) -> AppResult<Self> {
        self.ensure_pending(now)?;
        Ok(Self {
            status: InvitationStatus::Accepted,
            accepted_at: Some(now),
            accepted_by: Some(user_id),
            ..self.clone()
        })
    }

    /// Returns the cancelled copy.
    pub fn cancelled(&self, now: DateTime<Utc>) -> AppResult<Self> {
        self.ensure_pending(now)?;
        Ok(Self {
            status: InvitationStatus::Cancelled,
            cancelled_at: Some(now),
            ..self.clone()
        })
    }

    /// Returns the expired copy. Only valid once the expiry has elapsed.
    pub fn expired(&self, now: DateTime<Utc>) -> AppResult<Self> {
        if self.status != InvitationStatus::Pending || self.expires_at > now {
            return Err(AppError::conflict(format!(
                "Invitation {} cannot expire from '{}'",
                self.id, self.status
            )));
        }
        Ok(Self {
            status: InvitationStatus::Expired,
            ..self.clone()
        })
    }

    fn ensure_pending(&self, now: DateTime<Utc>) -> AppResult<()> {
        match self.effective_status(now) {
            InvitationStatus::Pending => Ok(()),
            other => Err(AppError::conflict(format!(
                "Invitation {} is already {other}",
                self.id
            ))),
        }
    }
}
