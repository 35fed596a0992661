//! PostgreSQL store backend.
//!
//! Every conditional write is expressed in SQL (`UPDATE … WHERE status = …`,
//! version checks, partial unique indexes) or inside a transaction, never as
//! a read followed by an unconditional write in application code.

pub mod connection;
pub mod error;
pub mod migration;

mod account;
mod invitation;
mod membership;
mod token;
mod workspace;

use sqlx::PgPool;

pub use connection::DatabasePool;
pub use migration::run_migrations;

/// sqlx-backed implementation of every store trait.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
