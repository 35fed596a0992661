//! Token pair returned by login and refresh.

use serde::{Deserialize, Serialize};

/// A freshly issued access/refresh token pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Signed access token (JWT).
    pub access_token: String,
    /// Opaque single-use refresh token.
    pub refresh_token: String,
    /// Always `"Bearer"`.
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

impl TokenPair {
    /// Builds a bearer token pair.
    pub fn bearer(access_token: String, refresh_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}
