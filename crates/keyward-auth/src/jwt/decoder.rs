//! Access-token verification.
//!
//! Verification is pure: signature, issuer and required claims are checked
//! by `jsonwebtoken`; expiry is checked against the caller-supplied instant
//! so the injected clock governs it.

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use tracing::debug;

use keyward_core::config::AuthConfig;
use keyward_core::error::AppError;
use keyward_core::result::AppResult;

use super::claims::Claims;

/// Validates access tokens.
#[derive(Clone)]
pub struct JwtDecoder {
    decoding_key: DecodingKey,
    validation: Validation,
    skew_seconds: i64,
}

impl std::fmt::Debug for JwtDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtDecoder")
            .field("validation", &self.validation)
            .field("skew_seconds", &self.skew_seconds)
            .finish()
    }
}

impl JwtDecoder {
    /// Creates a new decoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_issuer(&[config.jwt_issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            skew_seconds: config.clock_skew_seconds as i64,
        }
    }

    /// Decodes and validates an access token at `now`.
    ///
    /// Fails with `TokenExpired` or `InvalidToken`. Both share one public
    /// message; the detailed cause stays in the error's log message.
    pub fn decode(&self, token: &str, now: DateTime<Utc>) -> AppResult<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            let cause = match e.kind() {
                JwtErrorKind::InvalidSignature => "bad signature",
                JwtErrorKind::InvalidToken => "malformed token",
                JwtErrorKind::InvalidIssuer => "wrong issuer",
                JwtErrorKind::MissingRequiredClaim(_) => "missing claim",
                JwtErrorKind::InvalidAlgorithm => "unexpected algorithm",
                _ => "undecodable",
            };
            debug!(cause, error = %e, "Access token rejected");
            AppError::invalid_token(format!("Access token rejected: {cause} ({e})"))
        })?;

        let claims = data.claims;
        if claims.is_expired_at(now, self.skew_seconds) {
            debug!(account_id = %claims.sub, exp = claims.exp, "Access token expired");
            return Err(AppError::token_expired(format!(
                "Access token expired at {} (now {})",
                claims.exp,
                now.timestamp()
            )));
        }
        Ok(claims)
    }
}
