//! Collaborator traits defined in `keyward-core` and implemented elsewhere.

pub mod clock;
pub mod event_sink;
pub mod hasher;

pub use clock::{Clock, ManualClock, SystemClock};
pub use event_sink::EventSink;
pub use hasher::CredentialHasher;
