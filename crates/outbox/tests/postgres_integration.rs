//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container and are ignored by default
//! because they need a running Docker daemon. Run with:
//!
//! ```bash
//! cargo test -p outbox --test postgres_integration -- --ignored
//! ```

use std::sync::Arc;

use chrono::{Duration, Utc};
use futures_util::StreamExt;
use outbox::{OutboxMessage, OutboxStore, PostgresOutboxStore, enqueue_in_tx};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

#[ctor::ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Migrate once with a temporary pool
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            PostgresOutboxStore::new(temp_pool.clone())
                .run_migrations()
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and a cleared table
async fn get_test_store() -> PostgresOutboxStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE outbox_messages")
        .execute(&pool)
        .await
        .unwrap();

    PostgresOutboxStore::new(pool)
}

fn make_message(event_type: &str, age_seconds: i64) -> OutboxMessage {
    OutboxMessage::builder()
        .aggregate_type("order")
        .aggregate_id(Uuid::new_v4())
        .event_type(event_type)
        .payload(serde_json::json!({"test": true}))
        .occurred_at(Utc::now() - Duration::seconds(age_seconds))
        .build()
}

#[tokio::test]
#[serial]
#[ignore = "requires a running Docker daemon"]
async fn enqueue_fetch_and_mark_processed() {
    let store = get_test_store().await;

    store
        .enqueue(&[make_message("OrderPlaced", 60), make_message("OrderPaid", 30)])
        .await
        .unwrap();
    assert_eq!(store.pending_count().await.unwrap(), 2);

    let pending = store.fetch_pending(10, 5).await.unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].event_type, "OrderPlaced");
    assert_eq!(pending[1].event_type, "OrderPaid");

    store.mark_processed(pending[0].id).await.unwrap();

    let remaining = store.fetch_pending(10, 5).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].event_type, "OrderPaid");
    assert_eq!(store.pending_count().await.unwrap(), 1);
}

#[tokio::test]
#[serial]
#[ignore = "requires a running Docker daemon"]
async fn failed_messages_retry_and_exhaust() {
    let store = get_test_store().await;

    let message = make_message("StockReserved", 10);
    let id = message.id;
    store.enqueue(&[message]).await.unwrap();

    store.mark_failed(id, "consumer offline").await.unwrap();
    let pending = store.fetch_pending(10, 3).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].attempts, 1);
    assert_eq!(pending[0].last_error.as_deref(), Some("consumer offline"));

    store.mark_failed(id, "consumer offline").await.unwrap();
    store.mark_failed(id, "still offline").await.unwrap();

    assert!(store.fetch_pending(10, 3).await.unwrap().is_empty());

    let dead = store.exhausted(3, 10).await.unwrap();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].attempts, 3);
    assert_eq!(dead[0].last_error.as_deref(), Some("still offline"));
    // Exhausted messages stay in the table for operators.
    assert_eq!(store.pending_count().await.unwrap(), 1);
}

#[tokio::test]
#[serial]
#[ignore = "requires a running Docker daemon"]
async fn enqueue_in_tx_is_atomic_with_the_transaction() {
    let store = get_test_store().await;

    // Rolled back: nothing visible.
    let mut tx = store.pool().begin().await.unwrap();
    enqueue_in_tx(&mut tx, &[make_message("OrderPlaced", 10)])
        .await
        .unwrap();
    tx.rollback().await.unwrap();
    assert_eq!(store.pending_count().await.unwrap(), 0);

    // Committed: visible.
    let mut tx = store.pool().begin().await.unwrap();
    enqueue_in_tx(
        &mut tx,
        &[make_message("OrderPlaced", 10), make_message("OrderPaid", 5)],
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();
    assert_eq!(store.pending_count().await.unwrap(), 2);
}

#[tokio::test]
#[serial]
#[ignore = "requires a running Docker daemon"]
async fn stream_unprocessed_yields_oldest_first() {
    let store = get_test_store().await;

    store
        .enqueue(&[
            make_message("Newest", 10),
            make_message("Oldest", 300),
            make_message("Middle", 60),
        ])
        .await
        .unwrap();

    let processed = store.fetch_pending(1, 5).await.unwrap();
    store.mark_processed(processed[0].id).await.unwrap();

    let stream = store.stream_unprocessed();
    let messages: Vec<_> = stream.collect().await;
    assert_eq!(messages.len(), 2);
    let types: Vec<String> = messages
        .into_iter()
        .map(|m| m.unwrap().event_type)
        .collect();
    assert_eq!(types, ["Middle", "Newest"]);
}

#[tokio::test]
#[serial]
#[ignore = "requires a running Docker daemon"]
async fn message_metadata_is_preserved() {
    let store = get_test_store().await;

    let mut metadata = common::Metadata::new();
    metadata.insert("correlation_id", serde_json::json!("corr-123"));
    metadata.insert("actor", serde_json::json!("admin@example.com"));

    let message = OutboxMessage::builder()
        .aggregate_type("user")
        .aggregate_id(Uuid::new_v4())
        .event_type("UserRegistered")
        .payload(serde_json::json!({"email": "jamie@example.com"}))
        .metadata(metadata)
        .build();
    store.enqueue(&[message]).await.unwrap();

    let fetched = store.fetch_pending(1, 5).await.unwrap();
    assert_eq!(
        fetched[0].metadata.get("correlation_id"),
        Some(&serde_json::json!("corr-123"))
    );
    assert_eq!(
        fetched[0].metadata.get("actor"),
        Some(&serde_json::json!("admin@example.com"))
    );
}
