//! Entry points exposed to the transport layer.

pub mod retry;
pub mod service;

pub use retry::RetryPolicy;
pub use service::AuthOrchestrator;
