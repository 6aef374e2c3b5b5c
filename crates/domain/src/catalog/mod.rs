//! Catalog aggregates: products with variants and stock, the category tree,
//! and attribute definitions.

mod attribute;
mod category;
mod events;
mod product;
mod state;
mod value_objects;

pub use attribute::{Attribute, AttributeKind};
pub use category::Category;
pub use events::{AttributeEvent, CategoryEvent, ProductEvent};
pub use product::{Product, Variant};
pub use state::ProductStatus;
pub use value_objects::{Sku, Slug, StockLevel, VariantAttribute};

use common::{CategoryId, Currency, VariantId};
use thiserror::Error;

/// Errors raised by catalog aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("invalid slug: {0:?}")]
    InvalidSlug(String),

    #[error("invalid SKU: {0:?}")]
    InvalidSku(String),

    #[error("name must not be blank")]
    InvalidName(String),

    #[error("attribute name must be snake_case: {0:?}")]
    InvalidAttributeName(String),

    #[error("price must be positive, got {cents} cents")]
    InvalidPrice { cents: i64 },

    #[error("currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch {
        expected: Currency,
        actual: Currency,
    },

    #[error("cannot transition product from {from} to {to}")]
    InvalidStatusTransition { from: ProductStatus, to: ProductStatus },

    #[error("product is archived")]
    ProductArchived,

    #[error("product is not active")]
    ProductNotActive,

    #[error("SKU already in use: {sku}")]
    DuplicateSku { sku: String },

    #[error("variant not found: {variant_id}")]
    VariantNotFound { variant_id: VariantId },

    #[error("variant is inactive: {sku}")]
    VariantInactive { sku: String },

    #[error("product is not in category {category_id}")]
    CategoryNotAssigned { category_id: CategoryId },

    #[error("insufficient stock for {sku}: requested {requested}, available {available}")]
    InsufficientStock {
        sku: String,
        requested: u32,
        available: u32,
    },

    #[error("stock adjustment would drop on-hand to {would_be} below {reserved} reserved")]
    StockBelowReserved { would_be: i64, reserved: u32 },

    #[error("stock level out of range: {value}")]
    StockOutOfRange { value: i64 },

    #[error("cannot release {requested} of {sku}: only {reserved} reserved")]
    InsufficientReservation {
        sku: String,
        requested: u32,
        reserved: u32,
    },

    #[error("a category cannot be its own parent")]
    SelfParent,

    #[error("select attributes need at least one option")]
    NoSelectOptions,
}
