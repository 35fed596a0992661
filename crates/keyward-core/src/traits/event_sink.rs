//! Destination for domain and security events.

use async_trait::async_trait;

use crate::events::DomainEvent;

/// Receives events emitted by the auth core.
///
/// Publishing never fails the operation that produced the event; sinks are
/// expected to log and swallow their own delivery errors.
#[async_trait]
pub trait EventSink: Send + Sync + std::fmt::Debug + 'static {
    /// Delivers one event.
    async fn publish(&self, event: DomainEvent);
}
