//! Background maintenance for Keyward.
//!
//! This crate provides:
//! - The purge job expiring lapsed invitations and deleting long-expired
//!   refresh-token records
//! - A cron scheduler running that job periodically

pub mod jobs;
pub mod scheduler;

pub use jobs::{PurgeJob, PurgeReport};
pub use scheduler::CronScheduler;
