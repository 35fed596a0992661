//! Maintenance job implementations.

pub mod purge;

pub use purge::{PurgeJob, PurgeReport};
