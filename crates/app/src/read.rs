//! Read-side ports and DTOs.
//!
//! Queries never hand aggregates to callers; readers return these
//! serializable snapshots instead. The store layer implements the ports for
//! both its in-memory and Postgres backends, mapping through the
//! `from_aggregate` constructors so every backend presents identical shapes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CartId, CategoryId, Currency, Metadata, Money, OrderId, ProductId, UserId, VariantId};
use domain::RepositoryError;
use domain::cart::Cart;
use domain::catalog::{Category, Product, ProductStatus};
use domain::identity::{SavedAddress, User, UserRole, UserStatus};
use domain::order::{Order, OrderStatus, PaymentStatus};
use serde::Serialize;

/// One sellable variant with its effective price and availability.
#[derive(Debug, Clone, Serialize)]
pub struct VariantSummary {
    pub id: VariantId,
    pub sku: String,
    /// The variant override when set, the base price otherwise.
    pub price: Money,
    pub active: bool,
    pub on_hand: u32,
    pub reserved: u32,
    pub available: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub status: ProductStatus,
    pub base_price: Money,
    pub category_ids: Vec<CategoryId>,
    pub variants: Vec<VariantSummary>,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductDetail {
    pub fn from_aggregate(product: &Product) -> Self {
        let variants = product
            .variants()
            .iter()
            .map(|variant| VariantSummary {
                id: variant.id(),
                sku: variant.sku().as_str().to_string(),
                price: variant.price().unwrap_or_else(|| product.base_price()),
                active: variant.is_active(),
                on_hand: variant.stock().on_hand(),
                reserved: variant.stock().reserved(),
                available: variant.stock().available(),
            })
            .collect();

        Self {
            id: product.id(),
            name: product.name().to_string(),
            slug: product.slug().as_str().to_string(),
            description: product.description().to_string(),
            status: product.status(),
            base_price: product.base_price(),
            category_ids: product.category_ids().to_vec(),
            variants,
            metadata: product.metadata().clone(),
            created_at: product.created_at(),
            updated_at: product.updated_at(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategorySummary {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<CategoryId>,
    pub level: u32,
    pub active: bool,
}

impl CategorySummary {
    pub fn from_aggregate(category: &Category) -> Self {
        Self {
            id: category.id(),
            name: category.name().to_string(),
            slug: category.slug().as_str().to_string(),
            parent_id: category.parent_id(),
            level: category.level(),
            active: category.is_active(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub line_total: Money,
}

/// A cart with its totals recomputed from the lines at read time.
#[derive(Debug, Clone, Serialize)]
pub struct CartDetail {
    pub id: CartId,
    pub user_id: Option<UserId>,
    pub currency: Currency,
    pub lines: Vec<CartLine>,
    pub subtotal: Money,
    pub total_quantity: u32,
    pub metadata: Metadata,
    pub updated_at: DateTime<Utc>,
}

impl CartDetail {
    pub fn from_aggregate(cart: &Cart) -> Self {
        let lines = cart
            .items()
            .iter()
            .map(|item| CartLine {
                product_id: item.product_id,
                variant_id: item.variant_id,
                product_name: item.product_name.clone(),
                unit_price: item.unit_price,
                quantity: item.quantity,
                line_total: item.total_price(),
            })
            .collect();

        Self {
            id: cart.id(),
            user_id: cart.user_id(),
            currency: cart.currency(),
            lines,
            subtotal: cart.subtotal(),
            total_quantity: cart.total_quantity(),
            metadata: cart.metadata().clone(),
            updated_at: cart.updated_at(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub product_name: String,
    pub sku: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub line_total: Money,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub lines: Vec<OrderLine>,
    pub currency: Currency,
    pub subtotal: Money,
    pub tax: Money,
    pub shipping_cost: Money,
    pub total: Money,
    pub refunded: Money,
    pub shipping_method: String,
    pub tracking_number: Option<String>,
    pub cancel_reason: Option<String>,
    pub metadata: Metadata,
    pub placed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderDetail {
    pub fn from_aggregate(order: &Order) -> Self {
        let lines = order
            .items()
            .iter()
            .map(|item| OrderLine {
                product_id: item.product_id,
                variant_id: item.variant_id,
                product_name: item.product_name.clone(),
                sku: item.sku.clone(),
                unit_price: item.unit_price,
                quantity: item.quantity,
                line_total: item.total_price(),
            })
            .collect();

        Self {
            id: order.id(),
            user_id: order.user_id(),
            status: order.status(),
            payment_status: order.payment_status(),
            lines,
            currency: order.currency(),
            subtotal: order.subtotal(),
            tax: order.tax(),
            shipping_cost: order.shipping_cost(),
            total: order.total(),
            refunded: order.refunded(),
            shipping_method: order.shipping_method().to_string(),
            tracking_number: order.tracking_number().map(str::to_string),
            cancel_reason: order.cancel_reason().map(str::to_string),
            metadata: order.metadata().clone(),
            placed_at: order.created_at(),
            updated_at: order.updated_at(),
        }
    }
}

/// One row of a user's order history.
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total: Money,
    pub item_count: u32,
    pub placed_at: DateTime<Utc>,
}

impl OrderSummary {
    pub fn from_aggregate(order: &Order) -> Self {
        Self {
            id: order.id(),
            status: order.status(),
            payment_status: order.payment_status(),
            total: order.total(),
            item_count: order.items().iter().map(|item| item.quantity).sum(),
            placed_at: order.created_at(),
        }
    }
}

/// Account details without the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserDetail {
    pub id: UserId,
    pub email: String,
    pub email_verified: bool,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub status: UserStatus,
    pub failed_logins: u32,
    pub last_login_at: Option<DateTime<Utc>>,
    pub addresses: Vec<SavedAddress>,
    pub created_at: DateTime<Utc>,
}

impl UserDetail {
    pub fn from_aggregate(user: &User) -> Self {
        Self {
            id: user.id(),
            email: user.email().as_str().to_string(),
            email_verified: user.is_email_verified(),
            first_name: user.first_name().to_string(),
            last_name: user.last_name().to_string(),
            phone: user.phone().map(str::to_string),
            role: user.role(),
            status: user.status(),
            failed_logins: user.failed_logins(),
            last_login_at: user.last_login_at(),
            addresses: user.addresses().to_vec(),
            created_at: user.created_at(),
        }
    }
}

#[async_trait]
pub trait CatalogReader: Send + Sync {
    async fn product_detail(&self, id: ProductId)
    -> Result<Option<ProductDetail>, RepositoryError>;

    async fn product_by_slug(&self, slug: &str)
    -> Result<Option<ProductDetail>, RepositoryError>;

    /// All categories, parents before children.
    async fn list_categories(&self) -> Result<Vec<CategorySummary>, RepositoryError>;
}

#[async_trait]
pub trait CartReader: Send + Sync {
    async fn cart_detail(&self, id: CartId) -> Result<Option<CartDetail>, RepositoryError>;
}

#[async_trait]
pub trait OrderReader: Send + Sync {
    async fn order_detail(&self, id: OrderId) -> Result<Option<OrderDetail>, RepositoryError>;

    /// A user's orders, most recent first.
    async fn orders_for_user(&self, user_id: UserId)
    -> Result<Vec<OrderSummary>, RepositoryError>;
}

#[async_trait]
pub trait UserReader: Send + Sync {
    async fn user_detail(&self, id: UserId) -> Result<Option<UserDetail>, RepositoryError>;

    async fn user_by_email(&self, email: &str) -> Result<Option<UserDetail>, RepositoryError>;
}
