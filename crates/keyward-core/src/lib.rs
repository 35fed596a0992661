//! # keyward-core
//!
//! Core crate for Keyward. Contains the unified error system, configuration
//! schemas, typed identifiers, domain events, and the collaborator traits
//! (clock, credential hasher, event sink) the other crates are built against.
//!
//! This crate has **no** internal dependencies on other Keyward crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
