//! # keyward-entity
//!
//! Domain entity models for Keyward. Every struct in this crate is an
//! immutable value record: state transitions return a new record instead of
//! mutating in place, which keeps the store's conditional updates simple.
//! Database entities additionally derive `sqlx::FromRow`.

pub mod account;
pub mod invitation;
pub mod membership;
pub mod token;
pub mod workspace;
