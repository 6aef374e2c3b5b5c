//! Storage backends for the commerce platform.
//!
//! Implements the write-side repository ports from `domain` and the
//! read-side ports from `app`, twice: an in-memory flavor for tests and
//! local development, and the PostgreSQL flavor used in production. Both
//! honor the same save contract: optimistic version check, version bump,
//! and the drained domain events enqueued on the outbox atomically with
//! the state change.

pub mod datatable;
pub mod memory;
mod messages;
pub mod postgres;

pub use datatable::TableSchema;
pub use memory::{
    InMemoryAttributeRepository, InMemoryCartRepository, InMemoryCategoryRepository,
    InMemoryOrderRepository, InMemoryProductRepository, InMemoryReaders, InMemoryTables,
    InMemoryUserRepository,
};
pub use postgres::{
    PostgresAttributeRepository, PostgresCartRepository, PostgresCategoryRepository,
    PostgresOrderRepository, PostgresProductRepository, PostgresReaders, PostgresTables,
    PostgresUserRepository, connect, run_migrations,
};
