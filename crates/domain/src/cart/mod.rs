//! Shopping cart aggregate and events.

mod aggregate;
mod events;

pub use aggregate::{Cart, CartItem};
pub use events::CartEvent;

use common::{Currency, ProductId, VariantId};
use thiserror::Error;

/// Errors raised by the cart aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("quantity must be at least 1, got {quantity}")]
    InvalidQuantity { quantity: u32 },

    #[error("unit price must be positive, got {cents} cents")]
    InvalidPrice { cents: i64 },

    #[error("currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch {
        expected: Currency,
        actual: Currency,
    },

    #[error("item not found in cart: product {product_id}, variant {variant_id:?}")]
    ItemNotFound {
        product_id: ProductId,
        variant_id: Option<VariantId>,
    },

    #[error("cart is already owned by another user")]
    OwnedByAnotherUser,
}
