//! Consumer interface for delivered messages.

use async_trait::async_trait;

use crate::error::ConsumerError;
use crate::message::OutboxMessage;

/// Receives outbox messages from the processor.
///
/// Delivery is at-least-once and a message is only marked processed once
/// every interested consumer accepted it, so handlers must be idempotent:
/// a retry after a partial failure redelivers to consumers that already
/// succeeded.
#[async_trait]
pub trait EventConsumer: Send + Sync {
    /// Stable name, used in logs and failure records.
    fn name(&self) -> &'static str;

    /// Whether this consumer wants the message. Defaults to everything.
    fn interested_in(&self, _message: &OutboxMessage) -> bool {
        true
    }

    async fn handle(&self, message: &OutboxMessage) -> Result<(), ConsumerError>;
}
