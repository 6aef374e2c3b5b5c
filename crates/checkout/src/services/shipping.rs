//! Shipping provider trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{Money, OrderId};
use domain::Address;

use crate::error::CheckoutError;

/// A priced shipping option for a destination.
#[derive(Debug, Clone)]
pub struct ShippingQuote {
    /// Carrier method name, e.g. `"standard"`.
    pub method: String,
    /// Cost charged to the buyer.
    pub cost: Money,
}

/// Result of a successful shipment creation.
#[derive(Debug, Clone)]
pub struct Shipment {
    /// The tracking number assigned by the carrier.
    pub tracking_number: String,
}

/// Trait for shipping operations.
#[async_trait]
pub trait ShippingProvider: Send + Sync {
    /// Quotes shipping for a destination and order subtotal.
    async fn quote(
        &self,
        destination: &Address,
        subtotal: Money,
    ) -> Result<ShippingQuote, CheckoutError>;

    /// Creates a shipment for an order.
    async fn create_shipment(&self, order_id: OrderId) -> Result<Shipment, CheckoutError>;

    /// Cancels a previously created shipment.
    async fn cancel_shipment(&self, tracking_number: &str) -> Result<(), CheckoutError>;
}

#[derive(Debug, Default)]
struct InMemoryShippingState {
    shipments: HashMap<String, OrderId>,
    next_id: u32,
    fail_on_create: bool,
}

/// In-memory flat-rate shipping provider for testing.
#[derive(Debug, Clone)]
pub struct InMemoryShippingProvider {
    state: Arc<RwLock<InMemoryShippingState>>,
    flat_rate_cents: i64,
}

impl InMemoryShippingProvider {
    /// Creates a provider quoting a flat 5.00 per order.
    pub fn new() -> Self {
        Self {
            state: Arc::default(),
            flat_rate_cents: 500,
        }
    }

    /// Overrides the flat rate, in cents.
    pub fn with_flat_rate(mut self, cents: i64) -> Self {
        self.flat_rate_cents = cents;
        self
    }

    /// Configures the provider to fail on the next create_shipment call.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Returns the number of active shipments.
    pub fn shipment_count(&self) -> usize {
        self.state.read().unwrap().shipments.len()
    }

    /// Returns true if a shipment exists with the given tracking number.
    pub fn has_shipment(&self, tracking_number: &str) -> bool {
        self.state
            .read()
            .unwrap()
            .shipments
            .contains_key(tracking_number)
    }
}

impl Default for InMemoryShippingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ShippingProvider for InMemoryShippingProvider {
    async fn quote(
        &self,
        _destination: &Address,
        subtotal: Money,
    ) -> Result<ShippingQuote, CheckoutError> {
        Ok(ShippingQuote {
            method: "standard".to_string(),
            cost: Money::from_cents(self.flat_rate_cents, subtotal.currency()),
        })
    }

    async fn create_shipment(&self, order_id: OrderId) -> Result<Shipment, CheckoutError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_create {
            return Err(CheckoutError::ShippingProvider(
                "carrier unavailable".to_string(),
            ));
        }

        state.next_id += 1;
        let tracking_number = format!("TRACK-{:04}", state.next_id);
        state.shipments.insert(tracking_number.clone(), order_id);

        Ok(Shipment { tracking_number })
    }

    async fn cancel_shipment(&self, tracking_number: &str) -> Result<(), CheckoutError> {
        let mut state = self.state.write().unwrap();
        state.shipments.remove(tracking_number);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Currency;

    fn destination() -> Address {
        Address::new("100 Main St", None, "Springfield", "IL", "62704", "US").unwrap()
    }

    #[tokio::test]
    async fn test_quote_uses_flat_rate_in_subtotal_currency() {
        let provider = InMemoryShippingProvider::new().with_flat_rate(750);

        let quote = provider
            .quote(&destination(), Money::from_cents(10_000, Currency::Eur))
            .await
            .unwrap();
        assert_eq!(quote.method, "standard");
        assert_eq!(quote.cost, Money::from_cents(750, Currency::Eur));
    }

    #[tokio::test]
    async fn test_create_and_cancel_shipment() {
        let provider = InMemoryShippingProvider::new();
        let order_id = OrderId::new();

        let shipment = provider.create_shipment(order_id).await.unwrap();
        assert!(shipment.tracking_number.starts_with("TRACK-"));
        assert_eq!(provider.shipment_count(), 1);
        assert!(provider.has_shipment(&shipment.tracking_number));

        provider
            .cancel_shipment(&shipment.tracking_number)
            .await
            .unwrap();
        assert_eq!(provider.shipment_count(), 0);
    }

    #[tokio::test]
    async fn test_fail_on_create() {
        let provider = InMemoryShippingProvider::new();
        provider.set_fail_on_create(true);

        let result = provider.create_shipment(OrderId::new()).await;
        assert!(matches!(result, Err(CheckoutError::ShippingProvider(_))));
        assert_eq!(provider.shipment_count(), 0);
    }
}
