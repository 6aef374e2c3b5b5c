//! Write-side persistence ports.
//!
//! One repository per aggregate. `save` persists the current state, bumps
//! the version on success, and drains the aggregate's pending events into
//! the outbox within the same transaction. Implementations map optimistic
//! concurrency violations to [`RepositoryError::Conflict`].

use async_trait::async_trait;
use common::{AttributeId, CartId, CategoryId, OrderId, ProductId, UserId};

use crate::cart::Cart;
use crate::catalog::{Attribute, Category, Product, Slug};
use crate::error::RepositoryError;
use crate::identity::{Email, User};
use crate::order::Order;

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    async fn find_by_slug(&self, slug: &Slug) -> Result<Option<Product>, RepositoryError>;

    async fn slug_exists(&self, slug: &Slug) -> Result<bool, RepositoryError>;

    async fn save(&self, product: &mut Product) -> Result<(), RepositoryError>;

    async fn delete(&self, id: ProductId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn find(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError>;

    async fn find_by_slug(&self, slug: &Slug) -> Result<Option<Category>, RepositoryError>;

    async fn slug_exists(&self, slug: &Slug) -> Result<bool, RepositoryError>;

    /// Categories whose `parent_id` is the given id.
    async fn find_children(&self, id: CategoryId) -> Result<Vec<Category>, RepositoryError>;

    async fn save(&self, category: &mut Category) -> Result<(), RepositoryError>;

    async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait AttributeRepository: Send + Sync {
    async fn find(&self, id: AttributeId) -> Result<Option<Attribute>, RepositoryError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Attribute>, RepositoryError>;

    async fn name_exists(&self, name: &str) -> Result<bool, RepositoryError>;

    async fn save(&self, attribute: &mut Attribute) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn find(&self, id: CartId) -> Result<Option<Cart>, RepositoryError>;

    /// The user's most recently updated cart, if any.
    async fn find_for_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError>;

    async fn save(&self, cart: &mut Cart) -> Result<(), RepositoryError>;

    async fn delete(&self, id: CartId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    async fn save(&self, order: &mut Order) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    async fn email_exists(&self, email: &Email) -> Result<bool, RepositoryError>;

    async fn save(&self, user: &mut User) -> Result<(), RepositoryError>;
}
