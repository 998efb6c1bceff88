//! Notifications and entity change events
//!
//! The EventBus decouples mutations (REST handlers) from the clients that
//! watch them. It uses `tokio::sync::broadcast`, so a slow subscriber only
//! loses its own backlog.
//!
//! # Architecture
//!
//! ```text
//! REST Handler ──▶ EventBus::publish() / notify() ──▶ broadcast channel ──▶ SSE /events
//!                                       │
//!                                       └──▶ tracing (every notice is logged)
//! ```
//!
//! Notices are short toast messages with a level, emitted after every
//! mutation ("Client added") and on failures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Events related to document mutations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EntityEvent {
    Created {
        entity_type: String,
        entity_id: String,
        data: serde_json::Value,
    },
    Updated {
        entity_type: String,
        entity_id: String,
        data: serde_json::Value,
    },
    Deleted {
        entity_type: String,
        entity_id: String,
    },
}

/// Severity of a user-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
    Warning,
    Info,
}

/// Top-level event carried by the bus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AppEvent {
    Entity(EntityEvent),
    Notice { level: NoticeLevel, message: String },
}

impl AppEvent {
    pub fn event_kind(&self) -> &str {
        match self {
            AppEvent::Entity(_) => "entity",
            AppEvent::Notice { .. } => "notice",
        }
    }

    /// Get the entity type this event relates to
    pub fn entity_type(&self) -> Option<&str> {
        match self {
            AppEvent::Entity(
                EntityEvent::Created { entity_type, .. }
                | EntityEvent::Updated { entity_type, .. }
                | EntityEvent::Deleted { entity_type, .. },
            ) => Some(entity_type),
            AppEvent::Notice { .. } => None,
        }
    }

    /// Get the document id this event relates to
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            AppEvent::Entity(
                EntityEvent::Created { entity_id, .. }
                | EntityEvent::Updated { entity_id, .. }
                | EntityEvent::Deleted { entity_id, .. },
            ) => Some(entity_id),
            AppEvent::Notice { .. } => None,
        }
    }

    /// Get the action name (created, updated, deleted, notice)
    pub fn action(&self) -> &str {
        match self {
            AppEvent::Entity(EntityEvent::Created { .. }) => "created",
            AppEvent::Entity(EntityEvent::Updated { .. }) => "updated",
            AppEvent::Entity(EntityEvent::Deleted { .. }) => "deleted",
            AppEvent::Notice { .. } => "notice",
        }
    }
}

/// Envelope wrapping an event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event: AppEvent,
}

impl EventEnvelope {
    pub fn new(event: AppEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Broadcast-based event bus
///
/// Cheap to clone and shared across handlers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity
    ///
    /// The capacity determines how many events can be buffered before
    /// slow receivers start lagging.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to all subscribers
    ///
    /// Never fails: without subscribers the event is dropped. Returns the
    /// number of receivers.
    pub fn publish(&self, event: AppEvent) -> usize {
        self.sender.send(EventEnvelope::new(event)).unwrap_or(0)
    }

    /// Log a notice and publish it
    pub fn notify(&self, level: NoticeLevel, message: impl Into<String>) -> usize {
        let message = message.into();
        match level {
            NoticeLevel::Success | NoticeLevel::Info => tracing::info!(?level, "{message}"),
            NoticeLevel::Warning => tracing::warn!("{message}"),
            NoticeLevel::Error => tracing::error!("{message}"),
        }
        self.publish(AppEvent::Notice { level, message })
    }

    pub fn success(&self, message: impl Into<String>) -> usize {
        self.notify(NoticeLevel::Success, message)
    }

    pub fn error(&self, message: impl Into<String>) -> usize {
        self.notify(NoticeLevel::Error, message)
    }

    pub fn warning(&self, message: impl Into<String>) -> usize {
        self.notify(NoticeLevel::Warning, message)
    }

    /// Subscribe to events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entity_event_serialization() {
        let event = AppEvent::Entity(EntityEvent::Created {
            entity_type: "client".to_string(),
            entity_id: "c1".to_string(),
            data: json!({"name": "Acme"}),
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "entity");
        assert_eq!(json["action"], "created");
        assert_eq!(json["entity_type"], "client");
    }

    #[test]
    fn test_notice_serialization() {
        let event = AppEvent::Notice {
            level: NoticeLevel::Success,
            message: "Client added".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, json!({"kind": "notice", "level": "success", "message": "Client added"}));
        assert_eq!(event.action(), "notice");
        assert_eq!(event.entity_type(), None);
    }

    #[test]
    fn test_event_accessors() {
        let event = AppEvent::Entity(EntityEvent::Deleted {
            entity_type: "product".to_string(),
            entity_id: "p9".to_string(),
        });
        assert_eq!(event.entity_type(), Some("product"));
        assert_eq!(event.entity_id(), Some("p9"));
        assert_eq!(event.action(), "deleted");
        assert_eq!(event.event_kind(), "entity");
    }

    #[tokio::test]
    async fn test_event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let receivers = bus.publish(AppEvent::Entity(EntityEvent::Updated {
            entity_type: "invoice".to_string(),
            entity_id: "i1".to_string(),
            data: json!({"total": 10.0}),
        }));
        assert_eq!(receivers, 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event.entity_id(), Some("i1"));
        assert_eq!(received.event.action(), "updated");
    }

    #[tokio::test]
    async fn test_notify_reaches_every_subscriber() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        assert_eq!(bus.warning("Stock is low"), 2);

        let e1 = rx1.recv().await.unwrap();
        let e2 = rx2.recv().await.unwrap();
        assert_eq!(e1.id, e2.id);
        assert!(matches!(
            e1.event,
            AppEvent::Notice {
                level: NoticeLevel::Warning,
                ..
            }
        ));
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        assert_eq!(bus.success("Product added"), 0);
        assert_eq!(bus.receiver_count(), 0);
    }
}
