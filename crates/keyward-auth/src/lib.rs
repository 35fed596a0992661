//! # keyward-auth
//!
//! Identity and access control for Keyward.
//!
//! ## Modules
//!
//! - `lockout`: brute-force lockout policy and the guard applying it
//! - `jwt`: access-token claims, signing and verification
//! - `token`: refresh-token lineage: issue, rotate, revoke, reuse detection
//! - `password`: Argon2id hashing and password policy
//! - `account`: registration, password change and status changes
//! - `rbac`: capability table and role-grant rules
//! - `membership`: workspaces and per-workspace role assignments
//! - `invitation`: the invitation lifecycle
//! - `orchestrator`: the entry points composing all of the above
//! - `events`: the default event sink

pub mod account;
pub mod events;
pub mod invitation;
pub mod jwt;
pub mod lockout;
pub mod membership;
pub mod orchestrator;
pub mod password;
pub mod rbac;
pub mod token;

pub use account::AccountService;
pub use events::TracingEventSink;
pub use invitation::{InvitationManager, InvitationToken};
pub use jwt::{AccessSubject, Claims, JwtDecoder, JwtEncoder};
pub use lockout::{LockState, LockoutGuard, LockoutPolicy};
pub use membership::MembershipManager;
pub use orchestrator::{AuthOrchestrator, RetryPolicy};
pub use password::{Argon2Hasher, PasswordValidator};
pub use rbac::{Capability, RbacEnforcer, RbacPolicies};
pub use token::TokenService;
