//! Workspace and membership management.

pub mod manager;
pub mod slug;

pub use manager::MembershipManager;
