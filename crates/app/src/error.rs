//! Application error types.

use checkout::CheckoutError;
use domain::cart::CartError;
use domain::catalog::CatalogError;
use domain::identity::IdentityError;
use domain::order::OrderError;
use domain::{DomainError, RepositoryError};
use thiserror::Error;

use crate::datatable::DataTableError;

/// Errors surfaced by command and query handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// The mediator has no handler for the dispatched type.
    #[error("No handler registered for {0}")]
    HandlerNotRegistered(&'static str),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The request was rejected before reaching an aggregate.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Domain error.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Repository error.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Checkout error.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Datatable request error.
    #[error("Datatable error: {0}")]
    DataTable(#[from] DataTableError),
}

impl AppError {
    pub(crate) fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        AppError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        AppError::Domain(err.into())
    }
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        AppError::Domain(err.into())
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        AppError::Domain(err.into())
    }
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        AppError::Domain(err.into())
    }
}

/// Convenience type alias for handler results.
pub type Result<T> = std::result::Result<T, AppError>;
