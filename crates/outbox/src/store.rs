//! Outbox storage port.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::OutboxError;
use crate::message::{MessageId, OutboxMessage};

/// Stream of outbox messages, oldest first.
pub type MessageStream = Pin<Box<dyn Stream<Item = Result<OutboxMessage, OutboxError>> + Send>>;

/// Storage for staged messages.
///
/// Delivery is at-least-once: a message is fetched, handed to consumers,
/// and only then marked processed, so a crash in between redelivers it.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Appends messages to the outbox.
    ///
    /// The Postgres implementation also exposes
    /// [`enqueue_in_tx`](crate::postgres::enqueue_in_tx) so repositories can
    /// stage messages inside the transaction that writes the aggregate.
    async fn enqueue(&self, messages: &[OutboxMessage]) -> Result<(), OutboxError>;

    /// Unprocessed messages with fewer than `max_attempts` failures, oldest
    /// first.
    async fn fetch_pending(
        &self,
        limit: u32,
        max_attempts: u32,
    ) -> Result<Vec<OutboxMessage>, OutboxError>;

    /// Marks a message delivered to every consumer.
    async fn mark_processed(&self, id: MessageId) -> Result<(), OutboxError>;

    /// Records a failed delivery attempt.
    async fn mark_failed(&self, id: MessageId, error: &str) -> Result<(), OutboxError>;

    /// Count of all unprocessed messages, exhausted ones included.
    async fn pending_count(&self) -> Result<u64, OutboxError>;

    /// Unprocessed messages that burned through `max_attempts` and now wait
    /// for manual intervention.
    async fn exhausted(
        &self,
        max_attempts: u32,
        limit: u32,
    ) -> Result<Vec<OutboxMessage>, OutboxError>;
}
