//! Brute-force lockout protection.

pub mod guard;
pub mod policy;

pub use guard::LockoutGuard;
pub use policy::{FailureDecision, LockState, LockoutPolicy};
