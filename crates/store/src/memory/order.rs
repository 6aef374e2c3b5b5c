//! In-memory order repository.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::OrderId;
use domain::order::Order;
use domain::repository::OrderRepository;
use domain::{AggregateRoot, RepositoryError};
use outbox::{InMemoryOutboxStore, OutboxStore};
use tokio::sync::RwLock;

use super::check_version;
use crate::messages::drain_messages;

#[derive(Clone)]
pub struct InMemoryOrderRepository {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
    outbox: InMemoryOutboxStore,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::with_outbox(InMemoryOutboxStore::new())
    }

    pub fn with_outbox(outbox: InMemoryOutboxStore) -> Self {
        Self {
            orders: Arc::new(RwLock::new(HashMap::new())),
            outbox,
        }
    }

    pub(crate) async fn all(&self) -> Vec<Order> {
        self.orders.read().await.values().cloned().collect()
    }
}

impl Default for InMemoryOrderRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn find(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn save(&self, order: &mut Order) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;

        check_version(
            Order::aggregate_type(),
            orders.get(&order.id()).map(|stored| stored.version()),
            order.version(),
        )?;

        let messages = drain_messages(order)?;
        order.set_version(order.version().next());
        orders.insert(order.id(), order.clone());
        drop(orders);

        self.outbox
            .enqueue(&messages)
            .await
            .map_err(|err| RepositoryError::Backend(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Currency, Metadata, Money, ProductId, UserId, Version};
    use domain::Address;
    use domain::order::{OrderItem, PaymentMethod};

    fn placed_order() -> Order {
        let address = Address::new(
            "100 Main St",
            None,
            "Springfield",
            "IL",
            "62704",
            "US",
        )
        .unwrap();
        let item = OrderItem {
            product_id: ProductId::new(),
            variant_id: None,
            product_name: "Widget".to_string(),
            sku: "WID-1".to_string(),
            unit_price: Money::from_cents(1999, Currency::Usd),
            quantity: 2,
        };
        Order::place(
            UserId::new(),
            None,
            vec![item],
            address.clone(),
            address,
            "standard",
            Money::from_cents(500, Currency::Usd),
            Money::from_cents(330, Currency::Usd),
            Metadata::new(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_save_and_reload_preserves_lifecycle() {
        let repo = InMemoryOrderRepository::new();
        let mut order = placed_order();
        repo.save(&mut order).await.unwrap();
        assert_eq!(order.version(), Version::first());

        let mut reloaded = repo.find(order.id()).await.unwrap().unwrap();
        reloaded.mark_paid("PAY-0001", PaymentMethod::Card).unwrap();
        repo.save(&mut reloaded).await.unwrap();

        let paid = repo.find(order.id()).await.unwrap().unwrap();
        assert_eq!(paid.version(), Version::new(2));
        assert!(paid.payment_status().is_paid());
        assert_eq!(
            paid.payment().map(|record| record.transaction_id.as_str()),
            Some("PAY-0001")
        );
    }

    #[tokio::test]
    async fn test_stale_save_conflicts() {
        let repo = InMemoryOrderRepository::new();
        let mut order = placed_order();
        repo.save(&mut order).await.unwrap();

        let mut stale = repo.find(order.id()).await.unwrap().unwrap();

        order.mark_paid("PAY-0001", PaymentMethod::Card).unwrap();
        repo.save(&mut order).await.unwrap();

        stale.cancel("changed my mind").unwrap();
        let err = repo.save(&mut stale).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict { .. }));
    }
}
