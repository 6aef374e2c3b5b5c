//! Order domain events.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, UserId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::PaymentMethod;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OrderEvent {
    /// Order was placed from a cart.
    OrderPlaced {
        order_id: OrderId,
        user_id: UserId,
        item_count: u32,
        total: Money,
        placed_at: DateTime<Utc>,
    },

    /// A charge succeeded and the order moved to processing.
    OrderPaid {
        transaction_id: String,
        method: PaymentMethod,
        amount: Money,
    },

    /// A charge attempt failed; the order stays pending.
    OrderPaymentFailed { reason: String },

    /// Order was handed to the carrier.
    OrderShipped { tracking_number: String },

    /// Order reached the customer.
    OrderDelivered { delivered_at: DateTime<Utc> },

    /// Order was cancelled before delivery.
    OrderCancelled { reason: String },

    /// Some or all of the payment was returned.
    OrderRefunded {
        amount: Money,
        total_refunded: Money,
        reason: String,
    },
}

impl DomainEvent for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced { .. } => "OrderPlaced",
            OrderEvent::OrderPaid { .. } => "OrderPaid",
            OrderEvent::OrderPaymentFailed { .. } => "OrderPaymentFailed",
            OrderEvent::OrderShipped { .. } => "OrderShipped",
            OrderEvent::OrderDelivered { .. } => "OrderDelivered",
            OrderEvent::OrderCancelled { .. } => "OrderCancelled",
            OrderEvent::OrderRefunded { .. } => "OrderRefunded",
        }
    }
}
