//! Workspace entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use keyward_core::types::{AccountId, WorkspaceId};

use super::status::WorkspaceStatus;

/// A tenant that accounts join through memberships.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Workspace {
    /// Unique workspace identifier.
    pub id: WorkspaceId,
    /// Display name.
    pub name: String,
    /// Unique URL-safe slug.
    pub slug: String,
    /// The account that created the workspace.
    pub owner_id: AccountId,
    /// Lifecycle status.
    pub status: WorkspaceStatus,
    /// When the workspace was created.
    pub created_at: DateTime<Utc>,
    /// When the workspace was last written.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete timestamp.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Workspace {
    /// Builds a new active workspace.
    pub fn new(
        name: impl Into<String>,
        slug: impl Into<String>,
        owner_id: AccountId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: WorkspaceId::new(),
            name: name.into(),
            slug: slug.into(),
            owner_id,
            status: WorkspaceStatus::Active,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Whether members may currently act in this workspace.
    pub fn is_active(&self) -> bool {
        self.status == WorkspaceStatus::Active && self.deleted_at.is_none()
    }

    /// Returns a renamed copy.
    pub fn renamed(&self, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            updated_at: now,
            ..self.clone()
        }
    }

    /// Returns an archived, soft-deleted copy.
    pub fn archived(&self, now: DateTime<Utc>) -> Self {
        Self {
            status: WorkspaceStatus::Archived,
            deleted_at: Some(self.deleted_at.unwrap_or(now)),
            updated_at: now,
            ..self.clone()
        }
    }
}
