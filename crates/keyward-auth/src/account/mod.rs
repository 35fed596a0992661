//! Account lifecycle: registration, password change, status changes.

pub(crate) mod cas;
pub mod service;

pub use service::AccountService;
