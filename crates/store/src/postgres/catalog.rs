//! PostgreSQL catalog repositories.

use async_trait::async_trait;
use common::{AttributeId, CategoryId, ProductId, Version};
use domain::catalog::{Attribute, Category, Product, Slug};
use domain::repository::{AttributeRepository, CategoryRepository, ProductRepository};
use domain::{AggregateRoot, RepositoryError};
use outbox::enqueue_in_tx;
use sqlx::{PgPool, Row, postgres::PgRow};

use super::{backend, save_error, stored_version};
use crate::messages::drain_messages;

#[derive(Clone)]
pub struct PostgresProductRepository {
    pool: PgPool,
}

impl PostgresProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_product(row: PgRow) -> Result<Product, RepositoryError> {
    let document: serde_json::Value = row.try_get("document").map_err(backend)?;
    let version: i64 = row.try_get("version").map_err(backend)?;
    let mut product: Product = serde_json::from_value(document)?;
    product.set_version(Version::new(version));
    Ok(product)
}

#[async_trait]
impl ProductRepository for PostgresProductRepository {
    async fn find(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        sqlx::query("SELECT document, version FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .map(row_to_product)
            .transpose()
    }

    async fn find_by_slug(&self, slug: &Slug) -> Result<Option<Product>, RepositoryError> {
        sqlx::query("SELECT document, version FROM products WHERE slug = $1")
            .bind(slug.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .map(row_to_product)
            .transpose()
    }

    async fn slug_exists(&self, slug: &Slug) -> Result<bool, RepositoryError> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE slug = $1)")
            .bind(slug.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(backend)
    }

    #[tracing::instrument(skip(self, product), fields(product_id = %product.id(), slug = %product.slug()))]
    async fn save(&self, product: &mut Product) -> Result<(), RepositoryError> {
        let expected = product.version();
        let messages = drain_messages(product)?;
        product.set_version(expected.next());
        let document = serde_json::to_value(&*product)?;

        let mut tx = self.pool.begin().await.map_err(backend)?;
        if expected == Version::initial() {
            sqlx::query(
                r#"
                INSERT INTO products
                    (id, version, slug, name, status, base_price_cents, currency,
                     document, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(product.id().as_uuid())
            .bind(product.version().as_i64())
            .bind(product.slug().as_str())
            .bind(product.name())
            .bind(product.status().as_str())
            .bind(product.base_price().cents())
            .bind(product.base_price().currency().code())
            .bind(&document)
            .bind(product.created_at())
            .bind(product.updated_at())
            .execute(&mut *tx)
            .await
            .map_err(|err| save_error(err, "slug", product.slug().as_str()))?;
        } else {
            let result = sqlx::query(
                r#"
                UPDATE products
                SET version = $2, slug = $3, name = $4, status = $5,
                    base_price_cents = $6, currency = $7, document = $8, updated_at = $9
                WHERE id = $1 AND version = $10
                "#,
            )
            .bind(product.id().as_uuid())
            .bind(product.version().as_i64())
            .bind(product.slug().as_str())
            .bind(product.name())
            .bind(product.status().as_str())
            .bind(product.base_price().cents())
            .bind(product.base_price().currency().code())
            .bind(&document)
            .bind(product.updated_at())
            .bind(expected.as_i64())
            .execute(&mut *tx)
            .await
            .map_err(|err| save_error(err, "slug", product.slug().as_str()))?;

            if result.rows_affected() == 0 {
                let actual = stored_version(&mut tx, "products", product.id().as_uuid()).await?;
                return Err(RepositoryError::Conflict {
                    aggregate_type: Product::aggregate_type(),
                    expected,
                    actual,
                });
            }
        }

        enqueue_in_tx(&mut tx, &messages)
            .await
            .map_err(|err| RepositoryError::Backend(err.to_string()))?;
        tx.commit().await.map_err(backend)
    }

    async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PostgresCategoryRepository {
    pool: PgPool,
}

impl PostgresCategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_category(row: PgRow) -> Result<Category, RepositoryError> {
    let document: serde_json::Value = row.try_get("document").map_err(backend)?;
    let version: i64 = row.try_get("version").map_err(backend)?;
    let mut category: Category = serde_json::from_value(document)?;
    category.set_version(Version::new(version));
    Ok(category)
}

#[async_trait]
impl CategoryRepository for PostgresCategoryRepository {
    async fn find(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        sqlx::query("SELECT document, version FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .map(row_to_category)
            .transpose()
    }

    async fn find_by_slug(&self, slug: &Slug) -> Result<Option<Category>, RepositoryError> {
        sqlx::query("SELECT document, version FROM categories WHERE slug = $1")
            .bind(slug.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .map(row_to_category)
            .transpose()
    }

    async fn slug_exists(&self, slug: &Slug) -> Result<bool, RepositoryError> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM categories WHERE slug = $1)")
            .bind(slug.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(backend)
    }

    async fn find_children(&self, id: CategoryId) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query("SELECT document, version FROM categories WHERE parent_id = $1")
            .bind(id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.into_iter().map(row_to_category).collect()
    }

    #[tracing::instrument(skip(self, category), fields(category_id = %category.id()))]
    async fn save(&self, category: &mut Category) -> Result<(), RepositoryError> {
        let expected = category.version();
        let messages = drain_messages(category)?;
        category.set_version(expected.next());
        let document = serde_json::to_value(&*category)?;

        let mut tx = self.pool.begin().await.map_err(backend)?;
        if expected == Version::initial() {
            sqlx::query(
                r#"
                INSERT INTO categories
                    (id, version, slug, name, parent_id, level, active,
                     document, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(category.id().as_uuid())
            .bind(category.version().as_i64())
            .bind(category.slug().as_str())
            .bind(category.name())
            .bind(category.parent_id().map(|parent| parent.as_uuid()))
            .bind(category.level() as i32)
            .bind(category.is_active())
            .bind(&document)
            .bind(category.created_at())
            .bind(category.updated_at())
            .execute(&mut *tx)
            .await
            .map_err(|err| save_error(err, "slug", category.slug().as_str()))?;
        } else {
            let result = sqlx::query(
                r#"
                UPDATE categories
                SET version = $2, slug = $3, name = $4, parent_id = $5, level = $6,
                    active = $7, document = $8, updated_at = $9
                WHERE id = $1 AND version = $10
                "#,
            )
            .bind(category.id().as_uuid())
            .bind(category.version().as_i64())
            .bind(category.slug().as_str())
            .bind(category.name())
            .bind(category.parent_id().map(|parent| parent.as_uuid()))
            .bind(category.level() as i32)
            .bind(category.is_active())
            .bind(&document)
            .bind(category.updated_at())
            .bind(expected.as_i64())
            .execute(&mut *tx)
            .await
            .map_err(|err| save_error(err, "slug", category.slug().as_str()))?;

            if result.rows_affected() == 0 {
                let actual = stored_version(&mut tx, "categories", category.id().as_uuid()).await?;
                return Err(RepositoryError::Conflict {
                    aggregate_type: Category::aggregate_type(),
                    expected,
                    actual,
                });
            }
        }

        enqueue_in_tx(&mut tx, &messages)
            .await
            .map_err(|err| RepositoryError::Backend(err.to_string()))?;
        tx.commit().await.map_err(backend)
    }

    async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PostgresAttributeRepository {
    pool: PgPool,
}

impl PostgresAttributeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_attribute(row: PgRow) -> Result<Attribute, RepositoryError> {
    let document: serde_json::Value = row.try_get("document").map_err(backend)?;
    let version: i64 = row.try_get("version").map_err(backend)?;
    let mut attribute: Attribute = serde_json::from_value(document)?;
    attribute.set_version(Version::new(version));
    Ok(attribute)
}

#[async_trait]
impl AttributeRepository for PostgresAttributeRepository {
    async fn find(&self, id: AttributeId) -> Result<Option<Attribute>, RepositoryError> {
        sqlx::query("SELECT document, version FROM attributes WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .map(row_to_attribute)
            .transpose()
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Attribute>, RepositoryError> {
        sqlx::query("SELECT document, version FROM attributes WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .map(row_to_attribute)
            .transpose()
    }

    async fn name_exists(&self, name: &str) -> Result<bool, RepositoryError> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM attributes WHERE name = $1)")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(backend)
    }

    #[tracing::instrument(skip(self, attribute), fields(attribute_id = %attribute.id()))]
    async fn save(&self, attribute: &mut Attribute) -> Result<(), RepositoryError> {
        let expected = attribute.version();
        let messages = drain_messages(attribute)?;
        attribute.set_version(expected.next());
        let document = serde_json::to_value(&*attribute)?;

        let mut tx = self.pool.begin().await.map_err(backend)?;
        if expected == Version::initial() {
            sqlx::query(
                r#"
                INSERT INTO attributes (id, version, name, document, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(attribute.id().as_uuid())
            .bind(attribute.version().as_i64())
            .bind(attribute.name())
            .bind(&document)
            .bind(attribute.created_at())
            .bind(attribute.updated_at())
            .execute(&mut *tx)
            .await
            .map_err(|err| save_error(err, "name", attribute.name()))?;
        } else {
            let result = sqlx::query(
                r#"
                UPDATE attributes
                SET version = $2, name = $3, document = $4, updated_at = $5
                WHERE id = $1 AND version = $6
                "#,
            )
            .bind(attribute.id().as_uuid())
            .bind(attribute.version().as_i64())
            .bind(attribute.name())
            .bind(&document)
            .bind(attribute.updated_at())
            .bind(expected.as_i64())
            .execute(&mut *tx)
            .await
            .map_err(|err| save_error(err, "name", attribute.name()))?;

            if result.rows_affected() == 0 {
                let actual = stored_version(&mut tx, "attributes", attribute.id().as_uuid()).await?;
                return Err(RepositoryError::Conflict {
                    aggregate_type: Attribute::aggregate_type(),
                    expected,
                    actual,
                });
            }
        }

        enqueue_in_tx(&mut tx, &messages)
            .await
            .map_err(|err| RepositoryError::Backend(err.to_string()))?;
        tx.commit().await.map_err(backend)
    }
}
