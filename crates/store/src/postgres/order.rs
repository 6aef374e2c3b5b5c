//! PostgreSQL order repository.

use async_trait::async_trait;
use common::{OrderId, Version};
use domain::order::Order;
use domain::repository::OrderRepository;
use domain::{AggregateRoot, RepositoryError};
use outbox::enqueue_in_tx;
use sqlx::{PgPool, Row, postgres::PgRow};

use super::{backend, stored_version};
use crate::messages::drain_messages;

#[derive(Clone)]
pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_order(row: PgRow) -> Result<Order, RepositoryError> {
    let document: serde_json::Value = row.try_get("document").map_err(backend)?;
    let version: i64 = row.try_get("version").map_err(backend)?;
    let mut order: Order = serde_json::from_value(document)?;
    order.set_version(Version::new(version));
    Ok(order)
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn find(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        sqlx::query("SELECT document, version FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .map(row_to_order)
            .transpose()
    }

    #[tracing::instrument(skip(self, order), fields(order_id = %order.id()))]
    async fn save(&self, order: &mut Order) -> Result<(), RepositoryError> {
        let expected = order.version();
        let messages = drain_messages(order)?;
        order.set_version(expected.next());
        let document = serde_json::to_value(&*order)?;

        let mut tx = self.pool.begin().await.map_err(backend)?;
        if expected == Version::initial() {
            sqlx::query(
                r#"
                INSERT INTO orders
                    (id, version, user_id, status, payment_status, total_cents, currency,
                     document, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(order.id().as_uuid())
            .bind(order.version().as_i64())
            .bind(order.user_id().as_uuid())
            .bind(order.status().as_str())
            .bind(order.payment_status().as_str())
            .bind(order.total().cents())
            .bind(order.currency().code())
            .bind(&document)
            .bind(order.created_at())
            .bind(order.updated_at())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        } else {
            let result = sqlx::query(
                r#"
                UPDATE orders
                SET version = $2, status = $3, payment_status = $4, total_cents = $5,
                    document = $6, updated_at = $7
                WHERE id = $1 AND version = $8
                "#,
            )
            .bind(order.id().as_uuid())
            .bind(order.version().as_i64())
            .bind(order.status().as_str())
            .bind(order.payment_status().as_str())
            .bind(order.total().cents())
            .bind(&document)
            .bind(order.updated_at())
            .bind(expected.as_i64())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

            if result.rows_affected() == 0 {
                let actual = stored_version(&mut tx, "orders", order.id().as_uuid()).await?;
                return Err(RepositoryError::Conflict {
                    aggregate_type: Order::aggregate_type(),
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
