//! In-memory cart repository.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{CartId, UserId};
use domain::cart::Cart;
use domain::repository::CartRepository;
use domain::{AggregateRoot, RepositoryError};
use outbox::{InMemoryOutboxStore, OutboxStore};
use tokio::sync::RwLock;

use super::check_version;
use crate::messages::drain_messages;

#[derive(Clone)]
pub struct InMemoryCartRepository {
    carts: Arc<RwLock<HashMap<CartId, Cart>>>,
    outbox: InMemoryOutboxStore,
}

impl InMemoryCartRepository {
    pub fn new() -> Self {
        Self::with_outbox(InMemoryOutboxStore::new())
    }

    pub fn with_outbox(outbox: InMemoryOutboxStore) -> Self {
        Self {
            carts: Arc::new(RwLock::new(HashMap::new())),
            outbox,
        }
    }
}

impl Default for InMemoryCartRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CartRepository for InMemoryCartRepository {
    async fn find(&self, id: CartId) -> Result<Option<Cart>, RepositoryError> {
        Ok(self.carts.read().await.get(&id).cloned())
    }

    async fn find_for_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let carts = self.carts.read().await;
        Ok(carts
            .values()
            .filter(|cart| cart.user_id() == Some(user_id))
            .max_by_key(|cart| cart.updated_at())
            .cloned())
    }

    async fn save(&self, cart: &mut Cart) -> Result<(), RepositoryError> {
        let mut carts = self.carts.write().await;

        check_version(
            Cart::aggregate_type(),
            carts.get(&cart.id()).map(|stored| stored.version()),
            cart.version(),
        )?;

        let messages = drain_messages(cart)?;
        cart.set_version(cart.version().next());
        carts.insert(cart.id(), cart.clone());
        drop(carts);

        self.outbox
            .enqueue(&messages)
            .await
            .map_err(|err| RepositoryError::Backend(err.to_string()))
    }

    async fn delete(&self, id: CartId) -> Result<(), RepositoryError> {
        self.carts.write().await.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Currency, Metadata, Money, ProductId};

    #[tokio::test]
    async fn test_find_for_user_prefers_most_recent_cart() {
        let repo = InMemoryCartRepository::new();
        let user_id = UserId::new();

        let mut older = Cart::create(Some(user_id), Currency::Usd, Metadata::new());
        repo.save(&mut older).await.unwrap();

        let mut newer = Cart::create(Some(user_id), Currency::Usd, Metadata::new());
        newer
            .add_item(
                ProductId::new(),
                None,
                "Widget",
                Money::from_cents(1999, Currency::Usd),
                1,
            )
            .unwrap();
        repo.save(&mut newer).await.unwrap();

        let found = repo.find_for_user(user_id).await.unwrap().unwrap();
        assert_eq!(found.id(), newer.id());
    }

    #[tokio::test]
    async fn test_find_for_user_ignores_other_users() {
        let repo = InMemoryCartRepository::new();

        let mut cart = Cart::create(Some(UserId::new()), Currency::Usd, Metadata::new());
        repo.save(&mut cart).await.unwrap();

        assert!(repo.find_for_user(UserId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_saved_cart_round_trips_items() {
        let repo = InMemoryCartRepository::new();
        let mut cart = Cart::create(None, Currency::Usd, Metadata::new());
        cart.add_item(
            ProductId::new(),
            None,
            "Widget",
            Money::from_cents(1999, Currency::Usd),
            2,
        )
        .unwrap();
        repo.save(&mut cart).await.unwrap();

        let found = repo.find(cart.id()).await.unwrap().unwrap();
        assert_eq!(found.items().len(), 1);
        assert_eq!(
            found.subtotal(),
            Money::from_cents(3998, Currency::Usd)
        );
        assert!(found.pending_events().is_empty());
    }
}
