//! Refresh-token lineage persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use keyward_core::result::AppResult;
use keyward_core::types::{AccountId, LineageId, RefreshTokenId};
use keyward_entity::token::RefreshTokenRecord;

/// Result of an attempted rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotateOutcome {
    /// The record was active; it is now superseded and the successor stored.
    Rotated,
    /// The record was no longer active; nothing was written.
    NotActive,
}

/// Stores refresh-token records and enforces one active record per lineage.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync + std::fmt::Debug + 'static {
    /// Stores a new record (a lineage root).
    async fn insert(&self, record: &RefreshTokenRecord) -> AppResult<()>;

    /// Looks up a record by the hash of its token value.
    async fn find_by_hash(&self, token_hash: &str) -> AppResult<Option<RefreshTokenRecord>>;

    /// Atomically marks `current` superseded by `successor` and stores the
    /// successor, only if `current` is still active.
    async fn rotate(
        &self,
        current: RefreshTokenId,
        successor: &RefreshTokenRecord,
    ) -> AppResult<RotateOutcome>;

    /// Revokes every active record of a lineage. Returns the number revoked.
    async fn revoke_lineage(&self, lineage_id: LineageId, now: DateTime<Utc>) -> AppResult<u64>;

    /// Revokes every active record of every lineage an account owns.
    async fn revoke_all_for_account(
        &self,
        account_id: AccountId,
        now: DateTime<Utc>,
    ) -> AppResult<u64>;

    /// Whether the lineage still has an active record.
    async fn lineage_is_active(&self, lineage_id: LineageId) -> AppResult<bool>;

    /// Deletes records that expired before `cutoff`. Returns the number deleted.
    async fn purge_expired_before(&self, cutoff: DateTime<Utc>) -> AppResult<u64>;
}
