//! Account entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use keyward_core::types::AccountId;

use super::status::AccountStatus;

/// A registered identity.
///
/// `version` increases on every write and is the compare-and-swap token for
/// lockout counter updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Account {
    /// Unique account identifier.
    pub id: AccountId,
    /// Normalised (trimmed, lowercase) email address.
    pub email: String,
    /// Opaque password digest.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Lifecycle status.
    pub status: AccountStatus,
    /// Consecutive failed login attempts in the current window.
    pub failed_attempts: i32,
    /// When the most recent failure happened.
    pub last_failed_at: Option<DateTime<Utc>>,
    /// Login is refused until this instant.
    pub locked_until: Option<DateTime<Utc>>,
    /// Optimistic-concurrency version.
    pub version: i64,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last written.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete timestamp.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Builds a fresh active account.
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: AccountId::new(),
            email: email.into(),
            password_hash: password_hash.into(),
            status: AccountStatus::Active,
            failed_attempts: 0,
            last_failed_at: None,
            locked_until: None,
            version: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Whether a lock is in force at `now`.
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }

    /// Whole seconds until the lock lifts, rounded up; `None` if not locked.
    pub fn lock_remaining_seconds(&self, now: DateTime<Utc>) -> Option<u64> {
        let until = self.locked_until.filter(|until| *until > now)?;
        let millis = (until - now).num_milliseconds().max(0) as u64;
        Some(millis.div_ceil(1000))
    }

    /// Whether the account is soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some() || self.status == AccountStatus::Deleted
    }

    /// Returns a copy with new lockout bookkeeping.
    pub fn with_failure_state(
        &self,
        failed_attempts: i32,
        last_failed_at: Option<DateTime<Utc>>,
        locked_until: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            failed_attempts,
            last_failed_at,
            locked_until,
            version: self.version + 1,
            updated_at: now,
            ..self.clone()
        }
    }

    /// Returns a copy with the failure counter and lock cleared.
    pub fn with_failures_cleared(&self, now: DateTime<Utc>) -> Self {
        self.with_failure_state(0, None, None, now)
    }

    /// Returns a copy with a new password digest.
    pub fn with_password_hash(&self, password_hash: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            password_hash: password_hash.into(),
            version: self.version + 1,
            updated_at: now,
            ..self.clone()
        }
    }

    /// Returns a copy with a new status; `Deleted` also stamps `deleted_at`.
    pub fn with_status(&self, status: AccountStatus, now: DateTime<Utc>) -> Self {
        let deleted_at = match status {
            AccountStatus::Deleted => Some(self.deleted_at.unwrap_or(now)),
            _ => None,
        };
        Self {
            status,
            deleted_at,
            version: self.version + 1,
            updated_at: now,
            ..self.clone()
        }
    }
}
