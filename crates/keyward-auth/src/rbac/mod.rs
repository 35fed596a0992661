//! Role-based access control (RBAC) inside a workspace.

pub mod enforcer;
pub mod policies;

pub use enforcer::RbacEnforcer;
pub use policies::{Capability, RbacPolicies};
