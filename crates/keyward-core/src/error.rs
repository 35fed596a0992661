//! Unified application error types for Keyward.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator. Authentication-class failures carry a
//! detailed `message` for logs, while callers only ever see
//! [`AppError::public_message`].

use std::fmt;
use thiserror::Error;

/// Generic text returned for every credential failure.
const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Generic text returned for every token failure.
const INVALID_TOKEN: &str = "Invalid or expired token";

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The requested resource was not found.
    NotFound,
    /// Input validation failed, or an invitation has expired.
    Validation,
    /// Email/password did not authenticate.
    InvalidCredentials,
    /// A token was malformed, badly signed, unknown, or revoked.
    InvalidToken,
    /// A token was well-formed but past its expiry.
    TokenExpired,
    /// An already-rotated or revoked refresh token was presented again.
    TokenReuseDetected,
    /// The account is temporarily locked after repeated failures.
    AccountLocked,
    /// The caller does not have permission to perform the action.
    Forbidden,
    /// A conflict occurred (duplicate entry, concurrent modification, etc.).
    Conflict,
    /// A store call did not complete within its deadline.
    Timeout,
    /// The backing store is temporarily unreachable.
    Unavailable,
    /// Transient failures persisted past the retry budget.
    ServiceUnavailable,
    /// A non-transient database error occurred.
    Database,
    /// An internal server error occurred.
    Internal,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
}

impl ErrorKind {
    /// HTTP status class the transport layer should use for this kind.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::InvalidCredentials
            | Self::InvalidToken
            | Self::TokenExpired
            | Self::TokenReuseDetected
            | Self::AccountLocked => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Timeout | Self::Unavailable | Self::ServiceUnavailable => 503,
            Self::Database | Self::Internal | Self::Configuration | Self::Serialization => 500,
        }
    }

    /// Whether this failure may succeed if the operation is retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Unavailable)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::InvalidCredentials => write!(f, "INVALID_CREDENTIALS"),
            Self::InvalidToken => write!(f, "INVALID_TOKEN"),
            Self::TokenExpired => write!(f, "TOKEN_EXPIRED"),
            Self::TokenReuseDetected => write!(f, "TOKEN_REUSE_DETECTED"),
            Self::AccountLocked => write!(f, "ACCOUNT_LOCKED"),
            Self::Forbidden => write!(f, "FORBIDDEN"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::ServiceUnavailable => write!(f, "SERVICE_UNAVAILABLE"),
            Self::Database => write!(f, "DATABASE"),
            Self::Internal => write!(f, "INTERNAL"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
        }
    }
}

/// The unified application error used throughout Keyward.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A detailed, log-only error message.
    pub message: String,
    /// Seconds until a locked account may retry.
    pub retry_after_seconds: Option<u64>,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after_seconds: None,
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after_seconds: None,
            source: Some(Box::new(source)),
        }
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create an invalid-credentials error.
    pub fn invalid_credentials(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidCredentials, message)
    }

    /// Create an invalid-token error.
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidToken, message)
    }

    /// Create a token-expired error.
    pub fn token_expired(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TokenExpired, message)
    }

    /// Create a token-reuse error.
    pub fn token_reuse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TokenReuseDetected, message)
    }

    /// Create an account-locked error with a retry hint.
    pub fn account_locked(retry_after_seconds: u64) -> Self {
        Self {
            kind: ErrorKind::AccountLocked,
            message: format!("Account is locked for another {retry_after_seconds}s"),
            retry_after_seconds: Some(retry_after_seconds),
            source: None,
        }
    }

    /// Create a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// Create an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, message)
    }

    /// Create a service-unavailable error.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServiceUnavailable, message)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// HTTP status class for this error.
    pub fn http_status(&self) -> u16 {
        self.kind.http_status()
    }

    /// Whether the orchestrator may retry the failed operation.
    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }

    /// Caller-facing message.
    ///
    /// Every 401-class failure except a lockout collapses to one generic text
    /// so responses cannot be used as an enumeration oracle.
    pub fn public_message(&self) -> String {
        match self.kind {
            ErrorKind::InvalidCredentials => INVALID_CREDENTIALS.to_string(),
            ErrorKind::InvalidToken | ErrorKind::TokenExpired | ErrorKind::TokenReuseDetected => {
                INVALID_TOKEN.to_string()
            }
            ErrorKind::AccountLocked => "Account is temporarily locked".to_string(),
            ErrorKind::Timeout | ErrorKind::Unavailable | ErrorKind::ServiceUnavailable => {
                "Service temporarily unavailable".to_string()
            }
            ErrorKind::Database
            | ErrorKind::Internal
            | ErrorKind::Configuration
            | ErrorKind::Serialization => "Internal error".to_string(),
            _ => self.message.clone(),
        }
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            retry_after_seconds: self.retry_after_seconds,
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
