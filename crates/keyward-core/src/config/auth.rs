//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// Placeholder secret shipped in defaults; startup warns when it is still in use.
pub const INSECURE_DEFAULT_SECRET: &str = "CHANGE_ME_IN_PRODUCTION";

/// Token signing and credential configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for JWT signing (HMAC-SHA256).
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Issuer claim written into and required on every access token.
    #[serde(default = "default_issuer")]
    pub jwt_issuer: String,
    /// Access token TTL in minutes.
    #[serde(default = "default_access_ttl")]
    pub access_ttl_minutes: u64,
    /// Refresh token TTL in days.
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_days: u64,
    /// Minimum password length.
    #[serde(default = "default_password_min")]
    pub password_min_length: usize,
    /// Tolerated clock skew when checking access-token expiry, in seconds.
    #[serde(default = "default_skew")]
    pub clock_skew_seconds: u64,
}

impl AuthConfig {
    /// Whether the signing secret is still the shipped placeholder.
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == INSECURE_DEFAULT_SECRET
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            jwt_issuer: default_issuer(),
            access_ttl_minutes: default_access_ttl(),
            refresh_ttl_days: default_refresh_ttl(),
            password_min_length: default_password_min(),
            clock_skew_seconds: default_skew(),
        }
    }
}

fn default_jwt_secret() -> String {
    INSECURE_DEFAULT_SECRET.to_string()
}

fn default_issuer() -> String {
    "keyward".to_string()
}

fn default_access_ttl() -> u64 {
    15
}

fn default_refresh_ttl() -> u64 {
    14
}

fn default_password_min() -> usize {
    8
}

fn default_skew() -> u64 {
    5
}
