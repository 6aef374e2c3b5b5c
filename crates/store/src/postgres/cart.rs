//! PostgreSQL cart repository.

use async_trait::async_trait;
use common::{CartId, UserId, Version};
use domain::cart::Cart;
use domain::repository::CartRepository;
use domain::{AggregateRoot, RepositoryError};
use outbox::enqueue_in_tx;
use sqlx::{PgPool, Row, postgres::PgRow};

use super::{backend, stored_version};
use crate::messages::drain_messages;

#[derive(Clone)]
pub struct PostgresCartRepository {
    pool: PgPool,
}

impl PostgresCartRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_cart(row: PgRow) -> Result<Cart, RepositoryError> {
    let document: serde_json::Value = row.try_get("document").map_err(backend)?;
    let version: i64 = row.try_get("version").map_err(backend)?;
    let mut cart: Cart = serde_json::from_value(document)?;
    cart.set_version(Version::new(version));
    Ok(cart)
}

#[async_trait]
impl CartRepository for PostgresCartRepository {
    async fn find(&self, id: CartId) -> Result<Option<Cart>, RepositoryError> {
        sqlx::query("SELECT document, version FROM carts WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .map(row_to_cart)
            .transpose()
    }

    async fn find_for_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        sqlx::query(
            r#"
            SELECT document, version FROM carts
            WHERE user_id = $1
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .map(row_to_cart)
        .transpose()
    }

    #[tracing::instrument(skip(self, cart), fields(cart_id = %cart.id()))]
    async fn save(&self, cart: &mut Cart) -> Result<(), RepositoryError> {
        let expected = cart.version();
        let messages = drain_messages(cart)?;
        cart.set_version(expected.next());
        let document = serde_json::to_value(&*cart)?;

        let mut tx = self.pool.begin().await.map_err(backend)?;
        if expected == Version::initial() {
            sqlx::query(
                r#"
                INSERT INTO carts (id, version, user_id, currency, document, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(cart.id().as_uuid())
            .bind(cart.version().as_i64())
            .bind(cart.user_id().map(|user| user.as_uuid()))
            .bind(cart.currency().code())
            .bind(&document)
            .bind(cart.created_at())
            .bind(cart.updated_at())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        } else {
            let result = sqlx::query(
                r#"
                UPDATE carts
                SET version = $2, user_id = $3, currency = $4, document = $5, updated_at = $6
                WHERE id = $1 AND version = $7
                "#,
            )
            .bind(cart.id().as_uuid())
            .bind(cart.version().as_i64())
            .bind(cart.user_id().map(|user| user.as_uuid()))
            .bind(cart.currency().code())
            .bind(&document)
            .bind(cart.updated_at())
            .bind(expected.as_i64())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

            if result.rows_affected() == 0 {
                let actual = stored_version(&mut tx, "carts", cart.id().as_uuid()).await?;
                return Err(RepositoryError::Conflict {
                    aggregate_type: Cart::aggregate_type(),
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

    async fn delete(&self, id: CartId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM carts WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }
}
