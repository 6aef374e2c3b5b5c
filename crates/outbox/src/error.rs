//! Outbox error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutboxError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Error returned by a consumer that could not handle a message.
///
/// The processor records the text on the message and retries later; it
/// never inspects the error beyond that.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ConsumerError(pub String);

impl ConsumerError {
    pub fn new(message: impl Into<String>) -> Self {
        ConsumerError(message.into())
    }
}
