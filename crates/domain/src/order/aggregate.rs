//! Order aggregate.
//!
//! An order snapshots cart lines at placement and never edits them again.
//! Fulfillment and payment run as two coupled state machines: payment
//! confirmation moves fulfillment from `Pending` to `Processing`, and an
//! order can only ship once paid.

use chrono::{DateTime, Utc};
use common::{CartId, Currency, Metadata, Money, OrderId, UserId, Version};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::address::Address;
use crate::aggregate::AggregateRoot;

use super::{
    OrderError, OrderEvent, OrderItem, OrderStatus, PaymentMethod, PaymentRecord, PaymentStatus,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    #[serde(default)]
    version: Version,
    user_id: UserId,
    cart_id: Option<CartId>,
    items: Vec<OrderItem>,
    status: OrderStatus,
    payment_status: PaymentStatus,
    currency: Currency,
    shipping_method: String,
    shipping_cost: Money,
    tax: Money,
    total: Money,
    refunded: Money,
    shipping_address: Address,
    billing_address: Address,
    payment: Option<PaymentRecord>,
    tracking_number: Option<String>,
    cancel_reason: Option<String>,
    metadata: Metadata,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    pending: Vec<OrderEvent>,
}

impl Order {
    /// Places an order from snapshotted cart lines.
    ///
    /// All item prices, the shipping cost and the tax must share one
    /// currency. The total is `subtotal + tax + shipping_cost`.
    #[allow(clippy::too_many_arguments)]
    pub fn place(
        user_id: UserId,
        cart_id: Option<CartId>,
        items: Vec<OrderItem>,
        shipping_address: Address,
        billing_address: Address,
        shipping_method: impl Into<String>,
        shipping_cost: Money,
        tax: Money,
        metadata: Metadata,
    ) -> Result<Self, OrderError> {
        if items.is_empty() {
            return Err(OrderError::NoItems);
        }

        let currency = items[0].unit_price.currency();
        for item in &items {
            if item.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    quantity: item.quantity,
                });
            }
            if !item.unit_price.is_positive() {
                return Err(OrderError::InvalidPrice {
                    cents: item.unit_price.cents(),
                });
            }
            if item.unit_price.currency() != currency {
                return Err(OrderError::CurrencyMismatch {
                    expected: currency,
                    actual: item.unit_price.currency(),
                });
            }
        }
        for charge in [shipping_cost, tax] {
            if charge.is_negative() {
                return Err(OrderError::InvalidPrice {
                    cents: charge.cents(),
                });
            }
            if charge.currency() != currency {
                return Err(OrderError::CurrencyMismatch {
                    expected: currency,
                    actual: charge.currency(),
                });
            }
        }

        let subtotal = items
            .iter()
            .fold(Money::zero(currency), |acc, item| acc.add(item.total_price()));
        let total = subtotal.add(tax).add(shipping_cost);
        let item_count = items.len() as u32;

        let now = Utc::now();
        let mut order = Order {
            id: OrderId::new(),
            version: Version::initial(),
            user_id,
            cart_id,
            items,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            currency,
            shipping_method: shipping_method.into(),
            shipping_cost,
            tax,
            total,
            refunded: Money::zero(currency),
            shipping_address,
            billing_address,
            payment: None,
            tracking_number: None,
            cancel_reason: None,
            metadata,
            created_at: now,
            updated_at: now,
            pending: Vec::new(),
        };

        order.record(OrderEvent::OrderPlaced {
            order_id: order.id,
            user_id,
            item_count,
            total,
            placed_at: now,
        });
        Ok(order)
    }

    /// Records a successful charge and moves the order to `Processing`.
    pub fn mark_paid(
        &mut self,
        transaction_id: impl Into<String>,
        method: PaymentMethod,
    ) -> Result<(), OrderError> {
        if !self.payment_status.can_mark_paid() {
            return Err(OrderError::AlreadyPaid);
        }
        if !self.status.can_process() {
            return Err(OrderError::InvalidStatusTransition {
                current: self.status,
                action: "pay",
            });
        }

        let transaction_id = transaction_id.into();
        self.payment = Some(PaymentRecord {
            transaction_id: transaction_id.clone(),
            method,
            amount: self.total,
            paid_at: Utc::now(),
        });
        self.payment_status = PaymentStatus::Paid;
        self.status = OrderStatus::Processing;
        self.record(OrderEvent::OrderPaid {
            transaction_id,
            method,
            amount: self.total,
        });
        self.touch();
        Ok(())
    }

    /// Records a failed charge attempt. The order stays `Pending` so payment
    /// can be retried.
    pub fn record_payment_failure(&mut self, reason: impl Into<String>) -> Result<(), OrderError> {
        if !self.payment_status.can_fail() {
            return Err(OrderError::AlreadyPaid);
        }
        if !matches!(self.status, OrderStatus::Pending) {
            return Err(OrderError::InvalidStatusTransition {
                current: self.status,
                action: "record a payment failure for",
            });
        }

        self.payment_status = PaymentStatus::Failed;
        self.record(OrderEvent::OrderPaymentFailed {
            reason: reason.into(),
        });
        self.touch();
        Ok(())
    }

    /// Marks the order shipped with a carrier tracking number.
    ///
    /// An unpaid order cannot ship, whatever its fulfillment status says.
    pub fn ship(&mut self, tracking_number: impl Into<String>) -> Result<(), OrderError> {
        if !self.payment_status.is_paid() {
            return Err(OrderError::UnpaidOrder);
        }
        if !self.status.can_ship() {
            return Err(OrderError::InvalidStatusTransition {
                current: self.status,
                action: "ship",
            });
        }

        let tracking_number = tracking_number.into();
        self.tracking_number = Some(tracking_number.clone());
        self.status = OrderStatus::Shipped;
        self.record(OrderEvent::OrderShipped { tracking_number });
        self.touch();
        Ok(())
    }

    /// Marks the order delivered.
    pub fn deliver(&mut self) -> Result<(), OrderError> {
        if !self.status.can_deliver() {
            return Err(OrderError::InvalidStatusTransition {
                current: self.status,
                action: "deliver",
            });
        }

        self.status = OrderStatus::Delivered;
        self.record(OrderEvent::OrderDelivered {
            delivered_at: Utc::now(),
        });
        self.touch();
        Ok(())
    }

    /// Cancels the order. Allowed any time before delivery; a delivered
    /// order can only be refunded, not cancelled.
    pub fn cancel(&mut self, reason: impl Into<String>) -> Result<(), OrderError> {
        if !self.status.can_cancel() {
            return Err(OrderError::InvalidStatusTransition {
                current: self.status,
                action: "cancel",
            });
        }

        let reason = reason.into();
        self.cancel_reason = Some(reason.clone());
        self.status = OrderStatus::Cancelled;
        self.record(OrderEvent::OrderCancelled { reason });
        self.touch();
        Ok(())
    }

    /// Returns part or all of the payment.
    ///
    /// The running refund total may never exceed the order total; refunding
    /// the exact remainder moves the payment to `Refunded`.
    pub fn refund(&mut self, amount: Money, reason: impl Into<String>) -> Result<(), OrderError> {
        if !self.payment_status.can_refund() {
            return Err(OrderError::PaymentNotRefundable {
                status: self.payment_status,
            });
        }
        if !amount.is_positive() {
            return Err(OrderError::InvalidRefundAmount {
                cents: amount.cents(),
            });
        }
        if amount.currency() != self.currency {
            return Err(OrderError::CurrencyMismatch {
                expected: self.currency,
                actual: amount.currency(),
            });
        }
        let remaining = self.total.subtract(self.refunded);
        if amount.cents() > remaining.cents() {
            return Err(OrderError::RefundExceedsRemaining {
                requested: amount.cents(),
                remaining: remaining.cents(),
            });
        }

        self.refunded = self.refunded.add(amount);
        self.payment_status = if self.refunded == self.total {
            PaymentStatus::Refunded
        } else {
            PaymentStatus::PartiallyRefunded
        };
        self.record(OrderEvent::OrderRefunded {
            amount,
            total_refunded: self.refunded,
            reason: reason.into(),
        });
        self.touch();
        Ok(())
    }

    /// Sets a metadata entry. Recorded in state only, no event.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.metadata.insert(key, value);
        self.touch();
    }

    /// Sum of line totals, recomputed from the items.
    pub fn subtotal(&self) -> Money {
        self.items
            .iter()
            .fold(Money::zero(self.currency), |acc, item| {
                acc.add(item.total_price())
            })
    }

    /// Amount still refundable.
    pub fn remaining_refundable(&self) -> Money {
        self.total.subtract(self.refunded)
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn cart_id(&self) -> Option<CartId> {
        self.cart_id
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn shipping_method(&self) -> &str {
        &self.shipping_method
    }

    pub fn shipping_cost(&self) -> Money {
        self.shipping_cost
    }

    pub fn tax(&self) -> Money {
        self.tax
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn refunded(&self) -> Money {
        self.refunded
    }

    pub fn shipping_address(&self) -> &Address {
        &self.shipping_address
    }

    pub fn billing_address(&self) -> &Address {
        &self.billing_address
    }

    pub fn payment(&self) -> Option<&PaymentRecord> {
        self.payment.as_ref()
    }

    pub fn tracking_number(&self) -> Option<&str> {
        self.tracking_number.as_deref()
    }

    pub fn cancel_reason(&self) -> Option<&str> {
        self.cancel_reason.as_deref()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn record(&mut self, event: OrderEvent) {
        self.pending.push(event);
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl AggregateRoot for Order {
    type Event = OrderEvent;

    fn aggregate_type() -> &'static str {
        "order"
    }

    fn aggregate_id(&self) -> Uuid {
        self.id.as_uuid()
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn pending_events(&self) -> &[OrderEvent] {
        &self.pending
    }

    fn take_events(&mut self) -> Vec<OrderEvent> {
        std::mem::take(&mut self.pending)
    }
}
