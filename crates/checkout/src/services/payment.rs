//! Payment gateway trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{Money, OrderId, UserId};
use domain::order::PaymentMethod;

use crate::error::CheckoutError;

/// Result of a successful charge.
#[derive(Debug, Clone)]
pub struct PaymentCharge {
    /// The transaction ID assigned by the gateway.
    pub transaction_id: String,
}

/// Trait for payment processing operations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charges a user for an order.
    async fn charge(
        &self,
        order_id: OrderId,
        user_id: UserId,
        amount: Money,
        method: PaymentMethod,
    ) -> Result<PaymentCharge, CheckoutError>;

    /// Refunds part or all of a previous charge.
    async fn refund(&self, transaction_id: &str, amount: Money) -> Result<(), CheckoutError>;
}

#[derive(Debug)]
struct ChargeRecord {
    #[allow(dead_code)]
    order_id: OrderId,
    #[allow(dead_code)]
    user_id: UserId,
    remaining: Money,
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    charges: HashMap<String, ChargeRecord>,
    next_id: u32,
    fail_on_charge: bool,
}

/// In-memory payment gateway for testing.
///
/// A charge is dropped once refunds add up to its full amount, so tests can
/// assert on [`charge_count`](InMemoryPaymentGateway::charge_count) after
/// compensation.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory payment gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to decline charges.
    pub fn set_fail_on_charge(&self, fail: bool) {
        self.state.write().unwrap().fail_on_charge = fail;
    }

    /// Returns the number of charges that still hold money.
    pub fn charge_count(&self) -> usize {
        self.state.read().unwrap().charges.len()
    }

    /// Returns true if a charge exists with the given transaction ID.
    pub fn has_charge(&self, transaction_id: &str) -> bool {
        self.state
            .read()
            .unwrap()
            .charges
            .contains_key(transaction_id)
    }

    /// Returns the unrefunded amount of a charge, if it exists.
    pub fn remaining_amount(&self, transaction_id: &str) -> Option<Money> {
        self.state
            .read()
            .unwrap()
            .charges
            .get(transaction_id)
            .map(|record| record.remaining)
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn charge(
        &self,
        order_id: OrderId,
        user_id: UserId,
        amount: Money,
        _method: PaymentMethod,
    ) -> Result<PaymentCharge, CheckoutError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_charge {
            return Err(CheckoutError::PaymentGateway(
                "payment declined".to_string(),
            ));
        }

        state.next_id += 1;
        let transaction_id = format!("PAY-{:04}", state.next_id);
        state.charges.insert(
            transaction_id.clone(),
            ChargeRecord {
                order_id,
                user_id,
                remaining: amount,
            },
        );

        Ok(PaymentCharge { transaction_id })
    }

    async fn refund(&self, transaction_id: &str, amount: Money) -> Result<(), CheckoutError> {
        let mut state = self.state.write().unwrap();

        let Some(record) = state.charges.get_mut(transaction_id) else {
            return Err(CheckoutError::PaymentGateway(format!(
                "unknown transaction: {transaction_id}"
            )));
        };

        record.remaining = record.remaining.subtract(amount);
        if !record.remaining.is_positive() {
            state.charges.remove(transaction_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Currency;

    fn usd(cents: i64) -> Money {
        Money::from_cents(cents, Currency::Usd)
    }

    #[tokio::test]
    async fn test_charge_and_full_refund() {
        let gateway = InMemoryPaymentGateway::new();

        let charge = gateway
            .charge(OrderId::new(), UserId::new(), usd(5000), PaymentMethod::Card)
            .await
            .unwrap();
        assert!(charge.transaction_id.starts_with("PAY-"));
        assert_eq!(gateway.charge_count(), 1);
        assert!(gateway.has_charge(&charge.transaction_id));

        gateway
            .refund(&charge.transaction_id, usd(5000))
            .await
            .unwrap();
        assert_eq!(gateway.charge_count(), 0);
    }

    #[tokio::test]
    async fn test_partial_refund_keeps_the_charge() {
        let gateway = InMemoryPaymentGateway::new();
        let charge = gateway
            .charge(OrderId::new(), UserId::new(), usd(5000), PaymentMethod::Card)
            .await
            .unwrap();

        gateway
            .refund(&charge.transaction_id, usd(2000))
            .await
            .unwrap();
        assert_eq!(gateway.charge_count(), 1);
        assert_eq!(
            gateway.remaining_amount(&charge.transaction_id),
            Some(usd(3000))
        );
    }

    #[tokio::test]
    async fn test_fail_on_charge() {
        let gateway = InMemoryPaymentGateway::new();
        gateway.set_fail_on_charge(true);

        let result = gateway
            .charge(OrderId::new(), UserId::new(), usd(5000), PaymentMethod::Card)
            .await;
        assert!(matches!(result, Err(CheckoutError::PaymentGateway(_))));
        assert_eq!(gateway.charge_count(), 0);
    }

    #[tokio::test]
    async fn test_refund_unknown_transaction() {
        let gateway = InMemoryPaymentGateway::new();
        let result = gateway.refund("PAY-9999", usd(100)).await;
        assert!(matches!(result, Err(CheckoutError::PaymentGateway(_))));
    }

    #[tokio::test]
    async fn test_sequential_transaction_ids() {
        let gateway = InMemoryPaymentGateway::new();
        let order_id = OrderId::new();
        let user_id = UserId::new();

        let first = gateway
            .charge(order_id, user_id, usd(1000), PaymentMethod::Card)
            .await
            .unwrap();
        let second = gateway
            .charge(order_id, user_id, usd(1000), PaymentMethod::BankTransfer)
            .await
            .unwrap();

        assert_eq!(first.transaction_id, "PAY-0001");
        assert_eq!(second.transaction_id, "PAY-0002");
    }
}
