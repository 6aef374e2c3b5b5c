//! In-memory outbox store for tests and local runs.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::OutboxError;
use crate::message::{MessageId, OutboxMessage};
use crate::store::OutboxStore;

/// Keeps messages in a `Vec` behind an async lock. Ordering and retry
/// bookkeeping match the Postgres implementation.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOutboxStore {
    messages: Arc<RwLock<Vec<OutboxMessage>>>,
}

impl InMemoryOutboxStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message ever enqueued, processed or not. Test helper.
    pub async fn all(&self) -> Vec<OutboxMessage> {
        self.messages.read().await.clone()
    }
}

#[async_trait]
impl OutboxStore for InMemoryOutboxStore {
    async fn enqueue(&self, messages: &[OutboxMessage]) -> Result<(), OutboxError> {
        self.messages.write().await.extend_from_slice(messages);
        Ok(())
    }

    async fn fetch_pending(
        &self,
        limit: u32,
        max_attempts: u32,
    ) -> Result<Vec<OutboxMessage>, OutboxError> {
        let messages = self.messages.read().await;
        let mut pending: Vec<OutboxMessage> = messages
            .iter()
            .filter(|m| m.processed_at.is_none() && m.attempts < max_attempts)
            .cloned()
            .collect();
        pending.sort_by(|a, b| {
            a.occurred_at
                .cmp(&b.occurred_at)
                .then_with(|| a.id.as_uuid().cmp(&b.id.as_uuid()))
        });
        pending.truncate(limit as usize);
        Ok(pending)
    }

    async fn mark_processed(&self, id: MessageId) -> Result<(), OutboxError> {
        let mut messages = self.messages.write().await;
        if let Some(message) = messages.iter_mut().find(|m| m.id == id) {
            message.processed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn mark_failed(&self, id: MessageId, error: &str) -> Result<(), OutboxError> {
        let mut messages = self.messages.write().await;
        if let Some(message) = messages.iter_mut().find(|m| m.id == id) {
            message.attempts += 1;
            message.last_error = Some(error.to_string());
        }
        Ok(())
    }

    async fn pending_count(&self) -> Result<u64, OutboxError> {
        let messages = self.messages.read().await;
        Ok(messages.iter().filter(|m| m.processed_at.is_none()).count() as u64)
    }

    async fn exhausted(
        &self,
        max_attempts: u32,
        limit: u32,
    ) -> Result<Vec<OutboxMessage>, OutboxError> {
        let messages = self.messages.read().await;
        let mut dead: Vec<OutboxMessage> = messages
            .iter()
            .filter(|m| m.processed_at.is_none() && m.attempts >= max_attempts)
            .cloned()
            .collect();
        dead.sort_by_key(|m| m.occurred_at);
        dead.truncate(limit as usize);
        Ok(dead)
    }
}
