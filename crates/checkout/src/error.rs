//! Checkout error types.

use common::{CartId, OrderId, ProductId};
use domain::cart::CartError;
use domain::catalog::CatalogError;
use domain::order::OrderError;
use domain::{DomainError, RepositoryError};
use thiserror::Error;

/// Errors that can occur while orchestrating a checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Cart not found.
    #[error("Cart not found: {0}")]
    CartNotFound(CartId),

    /// The cart has no lines to order.
    #[error("Cart is empty")]
    EmptyCart,

    /// Orders need an owner; anonymous carts must be assigned first.
    #[error("Cart is not assigned to a user")]
    AnonymousCart,

    /// A cart line references a product that no longer exists.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order is not in a state the requested step can work with.
    #[error("Order not ready: {0}")]
    OrderNotReady(String),

    /// Payment gateway error.
    #[error("Payment gateway error: {0}")]
    PaymentGateway(String),

    /// Shipping provider error.
    #[error("Shipping provider error: {0}")]
    ShippingProvider(String),

    /// Domain error.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Repository error.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<CatalogError> for CheckoutError {
    fn from(err: CatalogError) -> Self {
        Self::Domain(err.into())
    }
}

impl From<CartError> for CheckoutError {
    fn from(err: CartError) -> Self {
        Self::Domain(err.into())
    }
}

impl From<OrderError> for CheckoutError {
    fn from(err: OrderError) -> Self {
        Self::Domain(err.into())
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
