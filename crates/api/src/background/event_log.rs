//! Structured log line for every domain event.

use pixora_events::DomainEvent;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// Log events until the bus is closed.
pub async fn run(mut rx: broadcast::Receiver<DomainEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                tracing::info!(
                    event_type = %event.event_type,
                    subject_kind = event.subject_kind.as_deref().unwrap_or(""),
                    subject_id = event.subject_id,
                    user_id = ?event.user_id,
                    payload = %event.payload,
                    "Domain event",
                );
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event log lagged behind the bus");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
