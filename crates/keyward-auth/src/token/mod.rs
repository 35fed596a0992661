//! Refresh-token lineage management.

pub mod secret;
pub mod service;

pub use service::TokenService;
