//! Transactional outbox.
//!
//! Repositories stage domain events here in the same transaction that
//! persists the aggregate. The [`OutboxProcessor`] then polls for pending
//! messages and delivers them to [`EventConsumer`]s at-least-once, with
//! retry bookkeeping and a resting place for messages that keep failing.

pub mod consumer;
pub mod error;
pub mod memory;
pub mod message;
pub mod postgres;
pub mod processor;
pub mod store;

pub use consumer::EventConsumer;
pub use error::{ConsumerError, OutboxError};
pub use memory::InMemoryOutboxStore;
pub use message::{MessageId, OutboxMessage, OutboxMessageBuilder};
pub use postgres::{PostgresOutboxStore, enqueue_in_tx};
pub use processor::{BatchStats, OutboxProcessor};
pub use store::{MessageStream, OutboxStore};
