//! In-memory persistence for tests and local development.
//!
//! Each repository keeps aggregates behind an `Arc<RwLock<..>>` and honors
//! the same contract as the Postgres implementations: a successful save
//! checks the stored version, bumps it, and enqueues the drained events on
//! the attached outbox store.

mod cart;
mod catalog;
mod order;
mod readers;
mod tables;
mod user;

pub use cart::InMemoryCartRepository;
pub use catalog::{
    InMemoryAttributeRepository, InMemoryCategoryRepository, InMemoryProductRepository,
};
pub use order::InMemoryOrderRepository;
pub use readers::InMemoryReaders;
pub use tables::InMemoryTables;
pub use user::InMemoryUserRepository;

use common::Version;
use domain::RepositoryError;

/// Optimistic concurrency check against the stored copy.
pub(crate) fn check_version(
    aggregate_type: &'static str,
    stored: Option<Version>,
    expected: Version,
) -> Result<(), RepositoryError> {
    let actual = stored.unwrap_or(Version::initial());
    if actual != expected {
        return Err(RepositoryError::Conflict {
            aggregate_type,
            expected,
            actual,
        });
    }
    Ok(())
}
