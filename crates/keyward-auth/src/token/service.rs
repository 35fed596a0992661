//! Token service: access tokens plus refresh-token lineage.
//!
//! A lineage starts at login and grows by one record per refresh. Exactly one
//! record per lineage is active. Presenting a superseded or revoked record's
//! token is treated as theft: the whole lineage is revoked and a security
//! event is published.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use keyward_core::config::AuthConfig;
use keyward_core::error::AppError;
use keyward_core::events::{DomainEvent, SecurityEvent};
use keyward_core::result::AppResult;
use keyward_core::traits::{Clock, EventSink};
use keyward_core::types::{AccountId, LineageId};
use keyward_entity::token::{RefreshTokenRecord, TokenPair};
use keyward_store::{RotateOutcome, Store};

use super::secret::{generate_secret, hash_secret};
use crate::jwt::{AccessSubject, Claims, JwtDecoder, JwtEncoder};

/// Issues, verifies, rotates and revokes tokens.
#[derive(Debug, Clone)]
pub struct TokenService {
    store: Store,
    encoder: JwtEncoder,
    decoder: JwtDecoder,
    refresh_ttl: Duration,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
}

impl TokenService {
    /// Creates a token service from auth configuration.
    pub fn new(
        config: &AuthConfig,
        store: Store,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            store,
            encoder: JwtEncoder::new(config),
            decoder: JwtDecoder::new(config),
            refresh_ttl: Duration::days(config.refresh_ttl_days as i64),
            clock,
            sink,
        }
    }

    /// Issues a token pair and starts a new lineage.
    pub async fn issue(&self, subject: &AccessSubject) -> AppResult<TokenPair> {
        let now = self.clock.now();
        let refresh_token = generate_secret();
        let record = RefreshTokenRecord::root(
            subject.account_id,
            subject.workspace_id,
            hash_secret(&refresh_token),
            now,
            self.refresh_ttl,
        );

        self.store
            .bounded("token.insert", self.store.tokens().insert(&record))
            .await?;

        debug!(
            account_id = %subject.account_id,
            lineage_id = %record.lineage_id,
            "Refresh lineage started"
        );
        self.pair(subject, &record, refresh_token, now)
    }

    /// Verifies an access token's signature and expiry. No I/O.
    pub fn verify_access(&self, token: &str) -> AppResult<Claims> {
        self.decoder.decode(token, self.clock.now())
    }

    /// Whether the lineage an access token was minted from is still live.
    pub async fn lineage_is_active(&self, lineage_id: LineageId) -> AppResult<bool> {
        self.store
            .bounded(
                "token.lineage_is_active",
                self.store.tokens().lineage_is_active(lineage_id),
            )
            .await
    }

    /// Looks up the active record behind a presented refresh token.
    ///
    /// Unknown tokens fail with `InvalidToken`, expired ones with
    /// `TokenExpired`. A superseded or revoked record triggers reuse handling
    /// and fails with `TokenReuseDetected`.
    pub async fn resolve_refresh(&self, refresh_token: &str) -> AppResult<RefreshTokenRecord> {
        let record = self
            .store
            .bounded(
                "token.find_by_hash",
                self.store.tokens().find_by_hash(&hash_secret(refresh_token)),
            )
            .await?
            .ok_or_else(|| AppError::invalid_token("Unknown refresh token"))?;

        if !record.is_active() {
            return Err(self.report_reuse(&record).await);
        }

        let now = self.clock.now();
        if record.is_expired_at(now) {
            debug!(record_id = %record.id, expires_at = %record.expires_at, "Refresh token expired");
            return Err(AppError::token_expired(format!(
                "Refresh token {} expired at {}",
                record.id, record.expires_at
            )));
        }
        Ok(record)
    }

    /// Rotates `current` and returns the successor pair for `subject`.
    ///
    /// If another caller rotated `current` first, this is a reuse event.
    pub async fn rotate(
        &self,
        current: &RefreshTokenRecord,
        subject: &AccessSubject,
    ) -> AppResult<TokenPair> {
        let now = self.clock.now();
        let refresh_token = generate_secret();
        let successor = current.successor(hash_secret(&refresh_token), now, self.refresh_ttl);

        let outcome = self
            .store
            .bounded("token.rotate", self.store.tokens().rotate(current.id, &successor))
            .await?;

        match outcome {
            RotateOutcome::Rotated => {
                debug!(
                    lineage_id = %current.lineage_id,
                    from = %current.id,
                    to = %successor.id,
                    "Refresh token rotated"
                );
                self.pair(subject, &successor, refresh_token, now)
            }
            RotateOutcome::NotActive => Err(self.report_reuse(current).await),
        }
    }

    /// Revokes the lineage a refresh token belongs to. Unknown tokens are ignored.
    pub async fn revoke(&self, refresh_token: &str) -> AppResult<()> {
        let record = self
            .store
            .bounded(
                "token.find_by_hash",
                self.store.tokens().find_by_hash(&hash_secret(refresh_token)),
            )
            .await?;

        let Some(record) = record else {
            debug!("Logout with unknown refresh token ignored");
            return Ok(());
        };

        let revoked = self.revoke_lineage(record.lineage_id).await?;
        info!(
            account_id = %record.account_id,
            lineage_id = %record.lineage_id,
            revoked,
            "Refresh lineage revoked on logout"
        );
        Ok(())
    }

    /// Revokes one lineage. Returns the number of records revoked.
    pub async fn revoke_lineage(&self, lineage_id: LineageId) -> AppResult<u64> {
        self.store
            .bounded(
                "token.revoke_lineage",
                self.store.tokens().revoke_lineage(lineage_id, self.clock.now()),
            )
            .await
    }

    /// Revokes every lineage of an account and publishes `SessionsRevoked`.
    pub async fn revoke_all_for_account(&self, account_id: AccountId, reason: &str) -> AppResult<u64> {
        let now = self.clock.now();
        let revoked = self
            .store
            .bounded(
                "token.revoke_all_for_account",
                self.store.tokens().revoke_all_for_account(account_id, now),
            )
            .await?;

        info!(account_id = %account_id, revoked, reason, "All refresh lineages revoked");
        self.sink
            .publish(DomainEvent::security(
                now,
                Some(account_id.into_uuid()),
                SecurityEvent::SessionsRevoked {
                    account_id: account_id.into_uuid(),
                    reason: reason.to_string(),
                },
            ))
            .await;
        Ok(revoked)
    }

    /// Deletes records that expired more than `retention` ago.
    pub async fn purge_expired(&self, retention: Duration) -> AppResult<u64> {
        let cutoff = self.clock.now() - retention;
        let purged = self
            .store
            .bounded(
                "token.purge_expired_before",
                self.store.tokens().purge_expired_before(cutoff),
            )
            .await?;
        info!(purged, cutoff = %cutoff, "Purged expired refresh-token records");
        Ok(purged)
    }

    fn pair(
        &self,
        subject: &AccessSubject,
        record: &RefreshTokenRecord,
        refresh_token: String,
        now: DateTime<Utc>,
    ) -> AppResult<TokenPair> {
        let (access_token, _) = self.encoder.encode(subject, record.lineage_id, now)?;
        Ok(TokenPair::bearer(
            access_token,
            refresh_token,
            self.encoder.access_ttl().num_seconds(),
        ))
    }

    /// Revokes the lineage of a replayed record and reports it.
    ///
    /// Always returns the `TokenReuseDetected` error for the caller to
    /// propagate; a failure to revoke is returned instead so it is not lost.
    async fn report_reuse(&self, record: &RefreshTokenRecord) -> AppError {
        let revoked = match self.revoke_lineage(record.lineage_id).await {
            Ok(revoked) => revoked,
            Err(e) => return e,
        };

        warn!(
            account_id = %record.account_id,
            lineage_id = %record.lineage_id,
            record_id = %record.id,
            revoked,
            "Refresh token reuse detected; lineage revoked"
        );
        self.sink
            .publish(DomainEvent::security(
                self.clock.now(),
                Some(record.account_id.into_uuid()),
                SecurityEvent::TokenReuseDetected {
                    account_id: record.account_id.into_uuid(),
                    lineage_id: record.lineage_id.into_uuid(),
                    record_id: record.id.into_uuid(),
                    revoked_records: revoked,
                },
            ))
            .await;

        AppError::token_reuse(format!(
            "Refresh token {} was already rotated or revoked",
            record.id
        ))
    }
}
