//! Order fulfillment and payment state machines.

use serde::{Deserialize, Serialize};

/// Fulfillment status of an order.
///
/// ```text
///                            +-> Delivered
///                            |
/// Pending -> Processing -> Shipped
///    |           |           |
///    +-----------+-----------+-> Cancelled
/// ```
///
/// Delivered and Cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed, payment not yet confirmed.
    Pending,
    /// Payment confirmed, being prepared.
    Processing,
    /// Handed to the carrier.
    Shipped,
    /// Received by the customer.
    Delivered,
    /// Cancelled before delivery.
    Cancelled,
}

impl OrderStatus {
    pub fn can_process(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    pub fn can_ship(&self) -> bool {
        matches!(self, OrderStatus::Processing)
    }

    pub fn can_deliver(&self) -> bool {
        matches!(self, OrderStatus::Shipped)
    }

    /// Cancellation is allowed any time before delivery.
    pub fn can_cancel(&self) -> bool {
        matches!(
            self,
            OrderStatus::Pending | OrderStatus::Processing | OrderStatus::Shipped
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment status, tracked separately from fulfillment.
///
/// ```text
/// Pending -> Paid -> PartiallyRefunded -> Refunded
///    |        ^  \_____________________/
///    v        |              |
///  Failed ----+              +-> (Refunded directly)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Awaiting a successful charge.
    Pending,
    /// Charge succeeded in full.
    Paid,
    /// Last charge attempt failed; retry allowed.
    Failed,
    /// Part of the total was refunded.
    PartiallyRefunded,
    /// The full total was refunded.
    Refunded,
}

impl PaymentStatus {
    /// A charge can be recorded while pending or after a failed attempt.
    pub fn can_mark_paid(&self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Failed)
    }

    pub fn can_fail(&self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Failed)
    }

    pub fn can_refund(&self) -> bool {
        matches!(self, PaymentStatus::Paid | PaymentStatus::PartiallyRefunded)
    }

    pub fn is_paid(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Paid | PaymentStatus::PartiallyRefunded | PaymentStatus::Refunded
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::PartiallyRefunded => "partially_refunded",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
