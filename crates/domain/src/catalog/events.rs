//! Catalog domain events.

use chrono::{DateTime, Utc};
use common::{AttributeId, CategoryId, Money, ProductId, VariantId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::ProductStatus;

/// Events recorded by the product aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ProductEvent {
    /// Product was created.
    ProductCreated {
        product_id: ProductId,
        name: String,
        slug: String,
        base_price: Money,
        created_at: DateTime<Utc>,
    },

    /// Name or description changed.
    ProductDetailsUpdated { name: String, description: String },

    /// Base price changed.
    ProductPriceChanged {
        old_price: Money,
        new_price: Money,
    },

    /// Lifecycle status changed.
    ProductStatusChanged {
        old_status: ProductStatus,
        new_status: ProductStatus,
    },

    /// Product was assigned to a category.
    ProductCategoryAssigned { category_id: CategoryId },

    /// Product was removed from a category.
    ProductCategoryRemoved { category_id: CategoryId },

    /// A variant was added to the product.
    VariantAdded {
        variant_id: VariantId,
        sku: String,
        price: Option<Money>,
        initial_stock: u32,
    },

    /// A variant's price override changed.
    VariantPriceChanged {
        variant_id: VariantId,
        old_price: Option<Money>,
        new_price: Option<Money>,
    },

    /// A variant became sellable again.
    VariantActivated { variant_id: VariantId, sku: String },

    /// A variant was taken off sale.
    VariantDeactivated { variant_id: VariantId, sku: String },

    /// On-hand stock was adjusted by an operator.
    StockAdjusted {
        variant_id: VariantId,
        sku: String,
        delta: i64,
        on_hand: u32,
        available: u32,
    },

    /// Stock was reserved for a pending order.
    StockReserved {
        variant_id: VariantId,
        sku: String,
        quantity: u32,
        available: u32,
    },

    /// A reservation was released back to available stock.
    StockReleased {
        variant_id: VariantId,
        sku: String,
        quantity: u32,
        available: u32,
    },

    /// Reserved stock left the warehouse with a shipment.
    StockCommitted {
        variant_id: VariantId,
        sku: String,
        quantity: u32,
        on_hand: u32,
        available: u32,
    },
}

impl DomainEvent for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductCreated { .. } => "ProductCreated",
            ProductEvent::ProductDetailsUpdated { .. } => "ProductDetailsUpdated",
            ProductEvent::ProductPriceChanged { .. } => "ProductPriceChanged",
            ProductEvent::ProductStatusChanged { .. } => "ProductStatusChanged",
            ProductEvent::ProductCategoryAssigned { .. } => "ProductCategoryAssigned",
            ProductEvent::ProductCategoryRemoved { .. } => "ProductCategoryRemoved",
            ProductEvent::VariantAdded { .. } => "VariantAdded",
            ProductEvent::VariantPriceChanged { .. } => "VariantPriceChanged",
            ProductEvent::VariantActivated { .. } => "VariantActivated",
            ProductEvent::VariantDeactivated { .. } => "VariantDeactivated",
            ProductEvent::StockAdjusted { .. } => "StockAdjusted",
            ProductEvent::StockReserved { .. } => "StockReserved",
            ProductEvent::StockReleased { .. } => "StockReleased",
            ProductEvent::StockCommitted { .. } => "StockCommitted",
        }
    }
}

/// Events recorded by the category aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CategoryEvent {
    /// Category was created.
    CategoryCreated {
        category_id: CategoryId,
        name: String,
        slug: String,
        parent_id: Option<CategoryId>,
        level: u32,
    },

    /// Category was renamed.
    CategoryRenamed { name: String, slug: String },

    /// Category was moved under a different parent.
    CategoryMoved {
        parent_id: Option<CategoryId>,
        level: u32,
    },

    /// Category became visible.
    CategoryActivated,

    /// Category was hidden.
    CategoryDeactivated,
}

impl DomainEvent for CategoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CategoryEvent::CategoryCreated { .. } => "CategoryCreated",
            CategoryEvent::CategoryRenamed { .. } => "CategoryRenamed",
            CategoryEvent::CategoryMoved { .. } => "CategoryMoved",
            CategoryEvent::CategoryActivated => "CategoryActivated",
            CategoryEvent::CategoryDeactivated => "CategoryDeactivated",
        }
    }
}

/// Events recorded by the attribute aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum AttributeEvent {
    /// Attribute definition was created.
    AttributeCreated {
        attribute_id: AttributeId,
        name: String,
    },

    /// Display name or flags changed.
    AttributeUpdated {
        display_name: String,
        filterable: bool,
        searchable: bool,
        variant_defining: bool,
    },
}

impl DomainEvent for AttributeEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AttributeEvent::AttributeCreated { .. } => "AttributeCreated",
            AttributeEvent::AttributeUpdated { .. } => "AttributeUpdated",
        }
    }
}
