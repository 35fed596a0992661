//! Store interfaces, one per entity family.

pub mod account;
pub mod invitation;
pub mod membership;
pub mod token;
pub mod workspace;

pub use account::AccountStore;
pub use invitation::{AcceptOutcome, InvitationStore};
pub use membership::{MembershipStore, MembershipWrite};
pub use token::{RefreshTokenStore, RotateOutcome};
pub use workspace::WorkspaceStore;
