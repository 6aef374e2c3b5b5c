//! Shopping cart aggregate.
//!
//! Carts exist anonymously or bound to a user. Lines are keyed by the
//! `(product_id, variant_id)` pair: adding a matching line merges quantities
//! instead of duplicating it. The subtotal is always recomputed from the
//! lines, never stored.

use chrono::{DateTime, Utc};
use common::{CartId, Currency, Metadata, Money, ProductId, UserId, VariantId, Version};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::AggregateRoot;

use super::{CartError, CartEvent};

/// A line in the cart. Price and name are captured at add time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl CartItem {
    pub fn total_price(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    id: CartId,
    #[serde(default)]
    version: Version,
    user_id: Option<UserId>,
    currency: Currency,
    items: Vec<CartItem>,
    metadata: Metadata,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    pending: Vec<CartEvent>,
}

impl Cart {
    /// Creates an empty cart. `user_id` is `None` for anonymous carts.
    pub fn create(user_id: Option<UserId>, currency: Currency, metadata: Metadata) -> Self {
        let now = Utc::now();
        let mut cart = Cart {
            id: CartId::new(),
            version: Version::initial(),
            user_id,
            currency,
            items: Vec::new(),
            metadata,
            created_at: now,
            updated_at: now,
            pending: Vec::new(),
        };

        cart.record(CartEvent::CartCreated {
            cart_id: cart.id,
            user_id,
            currency,
        });
        cart
    }

    /// Adds a line, merging into an existing `(product, variant)` line.
    ///
    /// On merge the stored unit price is refreshed to the incoming one, so
    /// the cart reflects the price the caller just looked up.
    pub fn add_item(
        &mut self,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        product_name: impl Into<String>,
        unit_price: Money,
        quantity: u32,
    ) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity { quantity });
        }
        if !unit_price.is_positive() {
            return Err(CartError::InvalidPrice {
                cents: unit_price.cents(),
            });
        }
        if unit_price.currency() != self.currency {
            return Err(CartError::CurrencyMismatch {
                expected: self.currency,
                actual: unit_price.currency(),
            });
        }

        if let Some(item) = self.item_mut(product_id, variant_id) {
            let old_quantity = item.quantity;
            item.quantity += quantity;
            item.unit_price = unit_price;
            let new_quantity = item.quantity;
            self.record(CartEvent::CartItemQuantityChanged {
                product_id,
                variant_id,
                old_quantity,
                new_quantity,
            });
        } else {
            let product_name = product_name.into();
            self.items.push(CartItem {
                product_id,
                variant_id,
                product_name: product_name.clone(),
                unit_price,
                quantity,
            });
            self.record(CartEvent::CartItemAdded {
                product_id,
                variant_id,
                product_name,
                unit_price,
                quantity,
            });
        }
        self.touch();
        Ok(())
    }

    /// Sets a line's quantity. Zero removes the line.
    pub fn update_quantity(
        &mut self,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        quantity: u32,
    ) -> Result<(), CartError> {
        if quantity == 0 {
            return self.remove_item(product_id, variant_id);
        }

        let item = self
            .item_mut(product_id, variant_id)
            .ok_or(CartError::ItemNotFound {
                product_id,
                variant_id,
            })?;
        if item.quantity == quantity {
            return Ok(());
        }

        let old_quantity = item.quantity;
        item.quantity = quantity;
        self.record(CartEvent::CartItemQuantityChanged {
            product_id,
            variant_id,
            old_quantity,
            new_quantity: quantity,
        });
        self.touch();
        Ok(())
    }

    /// Removes a line.
    pub fn remove_item(
        &mut self,
        product_id: ProductId,
        variant_id: Option<VariantId>,
    ) -> Result<(), CartError> {
        let before = self.items.len();
        self.items
            .retain(|item| !(item.product_id == product_id && item.variant_id == variant_id));
        if self.items.len() == before {
            return Err(CartError::ItemNotFound {
                product_id,
                variant_id,
            });
        }

        self.record(CartEvent::CartItemRemoved {
            product_id,
            variant_id,
        });
        self.touch();
        Ok(())
    }

    /// Empties the cart. No-op when already empty.
    pub fn clear(&mut self) {
        if self.items.is_empty() {
            return;
        }

        let item_count = self.items.len() as u32;
        self.items.clear();
        self.record(CartEvent::CartCleared { item_count });
        self.touch();
    }

    /// Claims an anonymous cart for a user.
    ///
    /// Assigning to the current owner is a no-op; a cart already owned by a
    /// different user cannot be reassigned.
    pub fn assign_to_user(&mut self, user_id: UserId) -> Result<(), CartError> {
        match self.user_id {
            None => {
                self.user_id = Some(user_id);
                self.record(CartEvent::CartAssignedToUser { user_id });
                self.touch();
                Ok(())
            }
            Some(owner) if owner == user_id => Ok(()),
            Some(_) => Err(CartError::OwnedByAnotherUser),
        }
    }

    /// Sum of all line totals, recomputed on every call.
    pub fn subtotal(&self) -> Money {
        self.items
            .iter()
            .fold(Money::zero(self.currency), |acc, item| {
                acc.add(item.total_price())
            })
    }

    /// Total unit count across all lines.
    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    pub fn id(&self) -> CartId {
        self.id
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, product_id: ProductId, variant_id: Option<VariantId>) -> Option<&CartItem> {
        self.items
            .iter()
            .find(|item| item.product_id == product_id && item.variant_id == variant_id)
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

    fn item_mut(
        &mut self,
        product_id: ProductId,
        variant_id: Option<VariantId>,
    ) -> Option<&mut CartItem> {
        self.items
            .iter_mut()
            .find(|item| item.product_id == product_id && item.variant_id == variant_id)
    }

    fn record(&mut self, event: CartEvent) {
        self.pending.push(event);
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl AggregateRoot for Cart {
    type Event = CartEvent;

    fn aggregate_type() -> &'static str {
        "cart"
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

    fn pending_events(&self) -> &[CartEvent] {
        &self.pending
    }

    fn take_events(&mut self) -> Vec<CartEvent> {
        std::mem::take(&mut self.pending)
    }
}
