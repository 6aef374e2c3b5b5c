//! Rolling feed of recent order activity.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::order::OrderEvent;
use outbox::{ConsumerError, EventConsumer, MessageId, OutboxMessage};
use tokio::sync::RwLock;
use uuid::Uuid;

/// One line in the feed.
#[derive(Debug, Clone)]
pub struct ActivityEntry {
    pub message_id: MessageId,
    pub order_id: Uuid,
    pub summary: String,
    pub occurred_at: DateTime<Utc>,
}

/// Keeps the last `capacity` order events as human-readable lines.
///
/// Redeliveries are recognised by message id as long as the original entry
/// is still in the window, which is the only window a duplicate can land in.
#[derive(Clone)]
pub struct ActivityFeed {
    capacity: usize,
    entries: Arc<RwLock<VecDeque<ActivityEntry>>>,
}

impl ActivityFeed {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
        }
    }

    /// Entries from newest to oldest.
    pub async fn entries(&self) -> Vec<ActivityEntry> {
        self.entries.read().await.iter().rev().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn summarize(event: &OrderEvent) -> String {
        match event {
            OrderEvent::OrderPlaced {
                item_count, total, ..
            } => {
                format!("placed with {item_count} item(s), total {total}")
            }
            OrderEvent::OrderPaid { amount, method, .. } => {
                format!("paid {amount} via {method}")
            }
            OrderEvent::OrderPaymentFailed { reason } => {
                format!("payment failed: {reason}")
            }
            OrderEvent::OrderShipped { tracking_number } => {
                format!("shipped, tracking {tracking_number}")
            }
            OrderEvent::OrderDelivered { .. } => "delivered".to_string(),
            OrderEvent::OrderCancelled { reason } => {
                format!("cancelled: {reason}")
            }
            OrderEvent::OrderRefunded {
                amount,
                total_refunded,
                ..
            } => {
                format!("refunded {amount} ({total_refunded} to date)")
            }
        }
    }
}

#[async_trait]
impl EventConsumer for ActivityFeed {
    fn name(&self) -> &'static str {
        "activity-feed"
    }

    fn interested_in(&self, message: &OutboxMessage) -> bool {
        message.aggregate_type == "order"
    }

    async fn handle(&self, message: &OutboxMessage) -> Result<(), ConsumerError> {
        let event: OrderEvent = serde_json::from_value(message.payload.clone())
            .map_err(|err| ConsumerError(format!("malformed order event: {err}")))?;

        let mut entries = self.entries.write().await;
        if entries.iter().any(|entry| entry.message_id == message.id) {
            return Ok(());
        }
        entries.push_back(ActivityEntry {
            message_id: message.id,
            order_id: message.aggregate_id,
            summary: Self::summarize(&event),
            occurred_at: message.occurred_at,
        });
        while entries.len() > self.capacity {
            entries.pop_front();
        }
        Ok(())
    }
}
