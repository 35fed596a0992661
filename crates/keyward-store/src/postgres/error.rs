//! Mapping of sqlx failures onto [`ErrorKind`].

use keyward_core::error::{AppError, ErrorKind};

/// Classify a sqlx error.
///
/// Unique violations are conflicts, an exhausted pool is a timeout and a lost
/// connection is unavailability; the last two are retried by the orchestrator.
pub fn classify(err: &sqlx::Error) -> ErrorKind {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => ErrorKind::Conflict,
        sqlx::Error::PoolTimedOut => ErrorKind::Timeout,
        sqlx::Error::Io(_) | sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => {
            ErrorKind::Unavailable
        }
        sqlx::Error::RowNotFound => ErrorKind::NotFound,
        _ => ErrorKind::Database,
    }
}

/// Build an error mapper carrying `context`, for use with `map_err`.
pub fn db_err(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |err| {
        let kind = classify(&err);
        AppError::with_source(kind, format!("{context}: {err}"), err)
    }
}
