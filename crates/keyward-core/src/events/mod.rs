//! Domain events emitted by Keyward operations.
//!
//! Events are handed to the configured [`EventSink`](crate::traits::EventSink)
//! and consumed by alerting, audit logging, and anything else downstream.

pub mod security;
pub mod workspace;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use security::SecurityEvent;
pub use workspace::WorkspaceEvent;

/// Wrapper for all domain events with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Unique event ID.
    pub id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// The account that caused the event (if applicable).
    pub actor_id: Option<Uuid>,
    /// The event payload.
    pub payload: EventPayload,
}

/// Union of all domain event types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event")]
pub enum EventPayload {
    /// A credential or token security signal.
    Security(SecurityEvent),
    /// A workspace, membership, or invitation change.
    Workspace(WorkspaceEvent),
}

impl DomainEvent {
    /// Create a new domain event stamped at `timestamp`.
    pub fn new(timestamp: DateTime<Utc>, actor_id: Option<Uuid>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::now_v7(),
            timestamp,
            actor_id,
            payload,
        }
    }

    /// Shorthand for a security event.
    pub fn security(timestamp: DateTime<Utc>, actor_id: Option<Uuid>, event: SecurityEvent) -> Self {
        Self::new(timestamp, actor_id, EventPayload::Security(event))
    }

    /// Shorthand for a workspace event.
    pub fn workspace(timestamp: DateTime<Utc>, actor_id: Option<Uuid>, event: WorkspaceEvent) -> Self {
        Self::new(timestamp, actor_id, EventPayload::Workspace(event))
    }

    /// Whether this event should raise an alert.
    pub fn is_alert(&self) -> bool {
        matches!(
            self.payload,
            EventPayload::Security(SecurityEvent::TokenReuseDetected { .. })
                | EventPayload::Security(SecurityEvent::AccountLocked { .. })
        )
    }
}
