//! Default event sink: structured log records.

use async_trait::async_trait;
use tracing::{info, warn};

use keyward_core::events::DomainEvent;
use keyward_core::traits::EventSink;

/// Writes every event as a tracing record under the `keyward::events` target.
///
/// Alert-class events (lockouts, token reuse) are logged at `WARN` so they
/// reach alerting pipelines filtering on level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn publish(&self, event: DomainEvent) {
        let payload = match serde_json::to_string(&event.payload) {
            Ok(json) => json,
            Err(e) => format!("<unserializable: {e}>"),
        };
        let actor_id = event.actor_id.map(|id| id.to_string());

        if event.is_alert() {
            warn!(
                target: "keyward::events",
                event_id = %event.id,
                timestamp = %event.timestamp,
                actor_id = actor_id.as_deref(),
                payload = %payload,
                "Security alert"
            );
        } else {
            info!(
                target: "keyward::events",
                event_id = %event.id,
                timestamp = %event.timestamp,
                actor_id = actor_id.as_deref(),
                payload = %payload,
                "Domain event"
            );
        }
    }
}
