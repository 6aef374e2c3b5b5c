//! Order aggregate, its state machines, and events.

mod aggregate;
mod events;
mod state;
mod value_objects;

pub use aggregate::Order;
pub use events::OrderEvent;
pub use state::{OrderStatus, PaymentStatus};
pub use value_objects::{OrderItem, PaymentMethod, PaymentRecord};

use common::Currency;
use thiserror::Error;

/// Errors raised by the order aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("an order needs at least one item")]
    NoItems,

    #[error("quantity must be at least 1, got {quantity}")]
    InvalidQuantity { quantity: u32 },

    #[error("price must be positive, got {cents} cents")]
    InvalidPrice { cents: i64 },

    #[error("currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch {
        expected: Currency,
        actual: Currency,
    },

    #[error("cannot {action} an order in {current} status")]
    InvalidStatusTransition {
        current: OrderStatus,
        action: &'static str,
    },

    #[error("order is already paid")]
    AlreadyPaid,

    #[error("cannot ship an unpaid order")]
    UnpaidOrder,

    #[error("payment in {status} status cannot be refunded")]
    PaymentNotRefundable { status: PaymentStatus },

    #[error("refund amount must be positive, got {cents} cents")]
    InvalidRefundAmount { cents: i64 },

    #[error("refund of {requested} cents exceeds the {remaining} cents remaining")]
    RefundExceedsRemaining { requested: i64, remaining: i64 },
}
