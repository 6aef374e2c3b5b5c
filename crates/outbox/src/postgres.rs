//! PostgreSQL-backed outbox store.

use async_trait::async_trait;
use common::Metadata;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::error::OutboxError;
use crate::message::{MessageId, OutboxMessage};
use crate::store::{MessageStream, OutboxStore};

/// Stages messages inside an open transaction.
///
/// Repositories call this after writing an aggregate so the messages commit
/// or roll back together with the state change.
pub async fn enqueue_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    messages: &[OutboxMessage],
) -> Result<(), OutboxError> {
    for message in messages {
        let metadata_json = serde_json::to_value(&message.metadata)?;

        sqlx::query(
            r#"
            INSERT INTO outbox_messages
                (id, aggregate_type, aggregate_id, event_type, payload, metadata,
                 occurred_at, processed_at, attempts, last_error)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(message.id.as_uuid())
        .bind(&message.aggregate_type)
        .bind(message.aggregate_id)
        .bind(&message.event_type)
        .bind(&message.payload)
        .bind(metadata_json)
        .bind(message.occurred_at)
        .bind(message.processed_at)
        .bind(message.attempts as i32)
        .bind(&message.last_error)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// PostgreSQL outbox store.
#[derive(Clone)]
pub struct PostgresOutboxStore {
    pool: PgPool,
}

impl PostgresOutboxStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    /// Streams every unprocessed message, oldest first, without paging.
    /// Meant for operational inspection, not the delivery loop.
    pub fn stream_unprocessed(&self) -> MessageStream {
        use futures_util::StreamExt;

        let stream = sqlx::query(
            r#"
            SELECT id, aggregate_type, aggregate_id, event_type, payload, metadata,
                   occurred_at, processed_at, attempts, last_error
            FROM outbox_messages
            WHERE processed_at IS NULL
            ORDER BY occurred_at ASC, id ASC
            "#,
        )
        .fetch(&self.pool)
        .map(|result| match result {
            Ok(row) => Self::row_to_message(row),
            Err(e) => Err(OutboxError::Database(e)),
        });

        Box::pin(stream)
    }

    fn row_to_message(row: PgRow) -> Result<OutboxMessage, OutboxError> {
        let metadata_json: serde_json::Value = row.try_get("metadata")?;
        let metadata: Metadata = serde_json::from_value(metadata_json)?;

        Ok(OutboxMessage {
            id: MessageId::from_uuid(row.try_get::<Uuid, _>("id")?),
            aggregate_type: row.try_get("aggregate_type")?,
            aggregate_id: row.try_get::<Uuid, _>("aggregate_id")?,
            event_type: row.try_get("event_type")?,
            payload: row.try_get("payload")?,
            metadata,
            occurred_at: row.try_get("occurred_at")?,
            processed_at: row.try_get("processed_at")?,
            attempts: row.try_get::<i32, _>("attempts")? as u32,
            last_error: row.try_get("last_error")?,
        })
    }
}

#[async_trait]
impl OutboxStore for PostgresOutboxStore {
    async fn enqueue(&self, messages: &[OutboxMessage]) -> Result<(), OutboxError> {
        let mut tx = self.pool.begin().await?;
        enqueue_in_tx(&mut tx, messages).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn fetch_pending(
        &self,
        limit: u32,
        max_attempts: u32,
    ) -> Result<Vec<OutboxMessage>, OutboxError> {
        let rows = sqlx::query(
            r#"
            SELECT id, aggregate_type, aggregate_id, event_type, payload, metadata,
                   occurred_at, processed_at, attempts, last_error
            FROM outbox_messages
            WHERE processed_at IS NULL AND attempts < $1
            ORDER BY occurred_at ASC, id ASC
            LIMIT $2
            "#,
        )
        .bind(max_attempts as i32)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_message).collect()
    }

    async fn mark_processed(&self, id: MessageId) -> Result<(), OutboxError> {
        sqlx::query("UPDATE outbox_messages SET processed_at = NOW() WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_failed(&self, id: MessageId, error: &str) -> Result<(), OutboxError> {
        sqlx::query(
            "UPDATE outbox_messages SET attempts = attempts + 1, last_error = $2 WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn pending_count(&self) -> Result<u64, OutboxError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM outbox_messages WHERE processed_at IS NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count as u64)
    }

    async fn exhausted(
        &self,
        max_attempts: u32,
        limit: u32,
    ) -> Result<Vec<OutboxMessage>, OutboxError> {
        let rows = sqlx::query(
            r#"
            SELECT id, aggregate_type, aggregate_id, event_type, payload, metadata,
                   occurred_at, processed_at, attempts, last_error
            FROM outbox_messages
            WHERE processed_at IS NULL AND attempts >= $1
            ORDER BY occurred_at ASC, id ASC
            LIMIT $2
            "#,
        )
        .bind(max_attempts as i32)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_message).collect()
    }
}
