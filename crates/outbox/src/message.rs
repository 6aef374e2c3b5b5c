//! Outbox message envelope.

use chrono::{DateTime, Utc};
use common::Metadata;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an outbox message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        MessageId(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        MessageId(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for MessageId {
    fn from(uuid: Uuid) -> Self {
        MessageId(uuid)
    }
}

impl From<MessageId> for Uuid {
    fn from(id: MessageId) -> Self {
        id.0
    }
}

/// A domain event staged for delivery.
///
/// Written in the same transaction as the aggregate it came from, then
/// picked up by the [`OutboxProcessor`](crate::OutboxProcessor) and handed
/// to consumers. `processed_at` stays `NULL` until every consumer accepted
/// the message; `attempts` and `last_error` track failed deliveries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxMessage {
    pub id: MessageId,
    pub aggregate_type: String,
    pub aggregate_id: Uuid,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub metadata: Metadata,
    pub occurred_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub attempts: u32,
    pub last_error: Option<String>,
}

impl OutboxMessage {
    pub fn builder() -> OutboxMessageBuilder {
        OutboxMessageBuilder::new()
    }

    pub fn is_processed(&self) -> bool {
        self.processed_at.is_some()
    }
}

/// Builder for [`OutboxMessage`].
#[derive(Debug, Default)]
pub struct OutboxMessageBuilder {
    aggregate_type: Option<String>,
    aggregate_id: Option<Uuid>,
    event_type: Option<String>,
    payload: Option<serde_json::Value>,
    metadata: Metadata,
    occurred_at: Option<DateTime<Utc>>,
}

impl OutboxMessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn aggregate_type(mut self, aggregate_type: impl Into<String>) -> Self {
        self.aggregate_type = Some(aggregate_type.into());
        self
    }

    pub fn aggregate_id(mut self, aggregate_id: Uuid) -> Self {
        self.aggregate_id = Some(aggregate_id);
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }

    /// Builds the message with a fresh id and zero attempts.
    ///
    /// # Panics
    ///
    /// Panics if `aggregate_type`, `aggregate_id`, `event_type` or `payload`
    /// was not set.
    pub fn build(self) -> OutboxMessage {
        OutboxMessage {
            id: MessageId::new(),
            aggregate_type: self.aggregate_type.expect("aggregate_type is required"),
            aggregate_id: self.aggregate_id.expect("aggregate_id is required"),
            event_type: self.event_type.expect("event_type is required"),
            payload: self.payload.expect("payload is required"),
            metadata: self.metadata,
            occurred_at: self.occurred_at.unwrap_or_else(Utc::now),
            processed_at: None,
            attempts: 0,
            last_error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let aggregate_id = Uuid::new_v4();
        let message = OutboxMessage::builder()
            .aggregate_type("order")
            .aggregate_id(aggregate_id)
            .event_type("OrderPlaced")
            .payload(serde_json::json!({"total": {"cents": 5350, "currency": "USD"}}))
            .build();

        assert_eq!(message.aggregate_type, "order");
        assert_eq!(message.aggregate_id, aggregate_id);
        assert_eq!(message.attempts, 0);
        assert!(!message.is_processed());
        assert!(message.last_error.is_none());
        assert!(message.metadata.is_empty());
    }

    #[test]
    #[should_panic(expected = "payload is required")]
    fn test_builder_panics_without_payload() {
        OutboxMessage::builder()
            .aggregate_type("order")
            .aggregate_id(Uuid::new_v4())
            .event_type("OrderPlaced")
            .build();
    }

    #[test]
    fn test_message_ids_are_unique() {
        assert_ne!(MessageId::new(), MessageId::new());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let message = OutboxMessage::builder()
            .aggregate_type("product")
            .aggregate_id(Uuid::new_v4())
            .event_type("StockReserved")
            .payload(serde_json::json!({"quantity": 2}))
            .build();

        let json = serde_json::to_string(&message).unwrap();
        let deserialized: OutboxMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.id, message.id);
        assert_eq!(deserialized.event_type, "StockReserved");
    }
}
