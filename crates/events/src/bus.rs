//! Event bus and the event types published on it.

use chrono::{DateTime, Utc};
use pixora_core::types::{DbId, UserId};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A generation finished and its image was recorded.
pub const GENERATION_SUCCEEDED: &str = "generation.succeeded";
/// A generation reached a terminal failure (including cancellation).
pub const GENERATION_FAILED: &str = "generation.failed";
/// A user's credit balance changed (reservation or refund).
pub const CREDITS_CHANGED: &str = "credits.changed";

// ---------------------------------------------------------------------------
// DomainEvent
// ---------------------------------------------------------------------------

/// A domain event.
///
/// Built with [`DomainEvent::new`] and the `with_*` builder methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Dot-separated event name, e.g. `"generation.succeeded"`.
    pub event_type: String,

    /// Kind of row the event is about (`"generation_job"`).
    pub subject_kind: Option<String>,

    pub subject_id: Option<DbId>,

    /// User the event concerns.
    pub user_id: Option<UserId>,

    /// Free-form JSON payload.
    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl DomainEvent {
    /// Create an event with only the required `event_type`.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            subject_kind: None,
            subject_id: None,
            user_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Shorthand for a [`CREDITS_CHANGED`] event.
    pub fn credits_changed(user_id: UserId, base: i32, bonus: i32) -> Self {
        Self::new(CREDITS_CHANGED)
            .with_user(user_id)
            .with_payload(serde_json::json!({ "base": base, "bonus": bonus }))
    }

    pub fn with_subject(mut self, kind: impl Into<String>, id: DbId) -> Self {
        self.subject_kind = Some(kind.into());
        self.subject_id = Some(id);
        self
    }

    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Any number of subscribers independently receive every published
/// [`DomainEvent`]. Slow subscribers observe `RecvError::Lagged` once the
/// buffer overflows.
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// With no subscribers the event is dropped.
    pub fn publish(&self, event: DomainEvent) {
        tracing::debug!(event_type = %event.event_type, "Publishing event");
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
