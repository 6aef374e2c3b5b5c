//! Checkout orchestration.
//!
//! Coordinates carts, product stock, orders and the external payment and
//! shipping services: reserve stock, place the order, charge the buyer, and
//! compensate in reverse order when a later step fails. The domain aggregates
//! stay the single source of truth for what each order transition allows;
//! this crate sequences the side effects around them.

pub mod error;
pub mod service;
pub mod services;

pub use error::CheckoutError;
pub use service::{CheckoutReceipt, CheckoutService};
pub use services::payment::{InMemoryPaymentGateway, PaymentCharge, PaymentGateway};
pub use services::shipping::{InMemoryShippingProvider, Shipment, ShippingProvider, ShippingQuote};
