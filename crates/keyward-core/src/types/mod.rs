//! Core type definitions used across the Keyward workspace.

pub mod email;
pub mod id;

pub use email::{emails_match, normalize_email};
pub use id::*;
