//! Cart domain events.

use common::{CartId, Currency, Money, ProductId, UserId, VariantId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CartEvent {
    /// Cart was created, anonymously or for a known user.
    CartCreated {
        cart_id: CartId,
        user_id: Option<UserId>,
        currency: Currency,
    },

    /// A new line was added.
    CartItemAdded {
        product_id: ProductId,
        variant_id: Option<VariantId>,
        product_name: String,
        unit_price: Money,
        quantity: u32,
    },

    /// An existing line's quantity changed, by merge or explicit update.
    CartItemQuantityChanged {
        product_id: ProductId,
        variant_id: Option<VariantId>,
        old_quantity: u32,
        new_quantity: u32,
    },

    /// A line was removed.
    CartItemRemoved {
        product_id: ProductId,
        variant_id: Option<VariantId>,
    },

    /// All lines were removed at once.
    CartCleared { item_count: u32 },

    /// An anonymous cart was claimed by a user.
    CartAssignedToUser { user_id: UserId },
}

impl DomainEvent for CartEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CartEvent::CartCreated { .. } => "CartCreated",
            CartEvent::CartItemAdded { .. } => "CartItemAdded",
            CartEvent::CartItemQuantityChanged { .. } => "CartItemQuantityChanged",
            CartEvent::CartItemRemoved { .. } => "CartItemRemoved",
            CartEvent::CartCleared { .. } => "CartCleared",
            CartEvent::CartAssignedToUser { .. } => "CartAssignedToUser",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_types() {
        let event = CartEvent::CartItemRemoved {
            product_id: ProductId::new(),
            variant_id: None,
        };
        assert_eq!(event.event_type(), "CartItemRemoved");

        let event = CartEvent::CartCleared { item_count: 3 };
        assert_eq!(event.event_type(), "CartCleared");
    }

    #[test]
    fn test_serialization_keeps_optional_variant() {
        let variant_id = VariantId::new();
        let event = CartEvent::CartItemAdded {
            product_id: ProductId::new(),
            variant_id: Some(variant_id),
            product_name: "Widget".to_string(),
            unit_price: Money::from_cents(1999, Currency::Usd),
            quantity: 2,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "CartItemAdded");

        let deserialized: CartEvent = serde_json::from_value(json).unwrap();
        if let CartEvent::CartItemAdded {
            variant_id: id, ..
        } = deserialized
        {
            assert_eq!(id, Some(variant_id));
        } else {
            panic!("Expected CartItemAdded event");
        }
    }
}
