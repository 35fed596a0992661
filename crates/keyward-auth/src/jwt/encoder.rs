//! Access-token creation.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use keyward_core::config::AuthConfig;
use keyward_core::error::AppError;
use keyward_core::result::AppResult;
use keyward_core::types::LineageId;

use super::claims::{AccessSubject, Claims};

/// Creates signed HS256 access tokens.
#[derive(Clone)]
pub struct JwtEncoder {
    encoding_key: EncodingKey,
    issuer: String,
    access_ttl: Duration,
}

impl std::fmt::Debug for JwtEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtEncoder")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .finish()
    }
}

impl JwtEncoder {
    /// Creates a new encoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.jwt_issuer.clone(),
            access_ttl: Duration::minutes(config.access_ttl_minutes as i64),
        }
    }

    /// Access-token lifetime.
    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Signs an access token for `subject`, bound to `lineage_id`.
    ///
    /// Returns the token and its expiry.
    pub fn encode(
        &self,
        subject: &AccessSubject,
        lineage_id: LineageId,
        now: DateTime<Utc>,
    ) -> AppResult<(String, DateTime<Utc>)> {
        let expires_at = now + self.access_ttl;
        let claims = Claims {
            sub: subject.account_id,
            email: subject.email.clone(),
            wid: subject.workspace_id,
            role: subject.role,
            lid: lineage_id,
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to encode access token: {e}")))?;
        Ok((token, expires_at))
    }
}
