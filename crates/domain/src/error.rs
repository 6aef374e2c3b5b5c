//! Domain error types.

use common::Version;
use thiserror::Error;
use uuid::Uuid;

use crate::cart::CartError;
use crate::catalog::CatalogError;
use crate::identity::IdentityError;
use crate::order::OrderError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in a catalog aggregate.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// An error occurred in the cart aggregate.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// An error occurred in the order aggregate.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// An error occurred in the user aggregate.
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    /// An error occurred in a repository.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Aggregate not found.
    #[error("Aggregate not found: {aggregate_type} with id {aggregate_id}")]
    AggregateNotFound {
        aggregate_type: &'static str,
        aggregate_id: Uuid,
    },
}

/// Errors surfaced by repository implementations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The aggregate was modified concurrently.
    #[error(
        "Concurrency conflict on {aggregate_type}: expected version {expected}, found {actual}"
    )]
    Conflict {
        aggregate_type: &'static str,
        expected: Version,
        actual: Version,
    },

    /// A unique constraint was violated.
    #[error("Duplicate {field}: {value}")]
    Duplicate { field: &'static str, value: String },

    /// Serialization of an aggregate document or event failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The underlying storage backend failed.
    #[error("Storage backend error: {0}")]
    Backend(String),
}
