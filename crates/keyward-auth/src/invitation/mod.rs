//! Invitation lifecycle: pending → accepted | expired | cancelled.

pub mod manager;

pub use manager::{InvitationManager, InvitationToken};
