//! Workspace (tenant) domain entities.

pub mod model;
pub mod status;

pub use model::Workspace;
pub use status::WorkspaceStatus;
