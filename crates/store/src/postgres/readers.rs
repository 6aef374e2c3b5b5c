//! Read-port implementations over the Postgres tables.
//!
//! Reads hydrate the aggregate from its JSONB document and map it through
//! the DTO constructors, so the read side always agrees with what a write
//! would load.

use app::read::{
    CartDetail, CartReader, CatalogReader, CategorySummary, OrderDetail, OrderReader,
    OrderSummary, ProductDetail, UserDetail, UserReader,
};
use async_trait::async_trait;
use common::{CartId, OrderId, ProductId, UserId, Version};
use domain::cart::Cart;
use domain::catalog::{Category, Product};
use domain::identity::{Email, User};
use domain::order::Order;
use domain::{AggregateRoot, RepositoryError};
use serde::de::DeserializeOwned;
use sqlx::{PgPool, Row, postgres::PgRow};

use super::backend;

#[derive(Clone)]
pub struct PostgresReaders {
    pool: PgPool,
}

impl PostgresReaders {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn hydrate<A>(row: PgRow) -> Result<A, RepositoryError>
where
    A: AggregateRoot + DeserializeOwned,
{
    let document: serde_json::Value = row.try_get("document").map_err(backend)?;
    let version: i64 = row.try_get("version").map_err(backend)?;
    let mut aggregate: A = serde_json::from_value(document)?;
    aggregate.set_version(Version::new(version));
    Ok(aggregate)
}

#[async_trait]
impl CatalogReader for PostgresReaders {
    async fn product_detail(
        &self,
        id: ProductId,
    ) -> Result<Option<ProductDetail>, RepositoryError> {
        sqlx::query("SELECT document, version FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .map(|row| hydrate::<Product>(row).map(|p| ProductDetail::from_aggregate(&p)))
            .transpose()
    }

    async fn product_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ProductDetail>, RepositoryError> {
        sqlx::query("SELECT document, version FROM products WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .map(|row| hydrate::<Product>(row).map(|p| ProductDetail::from_aggregate(&p)))
            .transpose()
    }

    async fn list_categories(&self) -> Result<Vec<CategorySummary>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT document, version FROM categories ORDER BY level ASC, name ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        rows.into_iter()
            .map(|row| hydrate::<Category>(row).map(|c| CategorySummary::from_aggregate(&c)))
            .collect()
    }
}

#[async_trait]
impl CartReader for PostgresReaders {
    async fn cart_detail(&self, id: CartId) -> Result<Option<CartDetail>, RepositoryError> {
        sqlx::query("SELECT document, version FROM carts WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .map(|row| hydrate::<Cart>(row).map(|c| CartDetail::from_aggregate(&c)))
            .transpose()
    }
}

#[async_trait]
impl OrderReader for PostgresReaders {
    async fn order_detail(&self, id: OrderId) -> Result<Option<OrderDetail>, RepositoryError> {
        sqlx::query("SELECT document, version FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .map(|row| hydrate::<Order>(row).map(|o| OrderDetail::from_aggregate(&o)))
            .transpose()
    }

    async fn orders_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<OrderSummary>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT document, version FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        rows.into_iter()
            .map(|row| hydrate::<Order>(row).map(|o| OrderSummary::from_aggregate(&o)))
            .collect()
    }
}

#[async_trait]
impl UserReader for PostgresReaders {
    async fn user_detail(&self, id: UserId) -> Result<Option<UserDetail>, RepositoryError> {
        sqlx::query("SELECT document, version FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .map(|row| hydrate::<User>(row).map(|u| UserDetail::from_aggregate(&u)))
            .transpose()
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<UserDetail>, RepositoryError> {
        let Ok(email) = Email::parse(email) else {
            return Ok(None);
        };
        sqlx::query("SELECT document, version FROM users WHERE email = $1")
            .bind(email.as_str().to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .map(|row| hydrate::<User>(row).map(|u| UserDetail::from_aggregate(&u)))
            .transpose()
    }
}
