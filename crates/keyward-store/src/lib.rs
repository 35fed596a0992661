//! # keyward-store
//!
//! Narrow store interfaces for every Keyward entity family, plus the
//! backends implementing them:
//!
//! - **memory**: single-process store, every operation serialised by one mutex
//! - **postgres**: sqlx-backed store using conditional updates and transactions
//!
//! Every read-modify-write the auth core needs is a single method here, so
//! atomicity is owned by the backend rather than by callers. The backend is
//! selected at runtime based on configuration; see [`Store::connect`].

#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod store;
pub mod traits;

pub use store::Store;
pub use traits::{
    AcceptOutcome, AccountStore, InvitationStore, MembershipStore, MembershipWrite,
    RefreshTokenStore, RotateOutcome, WorkspaceStore,
};
