//! JWT claims carried by every access token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use keyward_core::types::{AccountId, LineageId, WorkspaceId};
use keyward_entity::membership::MemberRole;

/// Who an access token is issued to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessSubject {
    /// The account.
    pub account_id: AccountId,
    /// Normalised email.
    pub email: String,
    /// Workspace scope, if the token is workspace-scoped.
    pub workspace_id: Option<WorkspaceId>,
    /// Role in that workspace.
    pub role: Option<MemberRole>,
}

impl AccessSubject {
    /// An unscoped subject.
    pub fn account(account_id: AccountId, email: impl Into<String>) -> Self {
        Self {
            account_id,
            email: email.into(),
            workspace_id: None,
            role: None,
        }
    }

    /// Returns the subject scoped to a workspace role.
    pub fn scoped(self, workspace_id: WorkspaceId, role: MemberRole) -> Self {
        Self {
            workspace_id: Some(workspace_id),
            role: Some(role),
            ..self
        }
    }
}

/// JWT claims payload embedded in every access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the account ID.
    pub sub: AccountId,
    /// Account email at issuance.
    pub email: String,
    /// Workspace scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wid: Option<WorkspaceId>,
    /// Role in the scoped workspace at issuance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<MemberRole>,
    /// Refresh lineage the token was minted from.
    pub lid: LineageId,
    /// Issuer.
    pub iss: String,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
    /// Unique token id.
    pub jti: Uuid,
}

impl Claims {
    /// Returns the account ID from the subject claim.
    pub fn account_id(&self) -> AccountId {
        self.sub
    }

    /// Returns the lineage this token belongs to.
    pub fn lineage_id(&self) -> LineageId {
        self.lid
    }

    /// Returns the expiration as a `DateTime<Utc>`.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Whether the token is expired at `now`, tolerating `skew_seconds`.
    pub fn is_expired_at(&self, now: DateTime<Utc>, skew_seconds: i64) -> bool {
        now.timestamp() >= self.exp.saturating_add(skew_seconds)
    }

    /// The subject this token was issued to.
    pub fn subject(&self) -> AccessSubject {
        AccessSubject {
            account_id: self.sub,
            email: self.email.clone(),
            workspace_id: self.wid,
            role: self.role,
        }
    }
}
