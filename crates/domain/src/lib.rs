//! Domain model of the commerce platform.
//!
//! Aggregates are state-stored: operations validate against current state,
//! mutate it, and record notification events that repositories drain into
//! the outbox when they persist the aggregate. Nothing here talks to a
//! database; persistence lives behind the ports in [`repository`].

pub mod address;
pub mod aggregate;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod identity;
pub mod order;
pub mod repository;

pub use address::{Address, AddressError};
pub use aggregate::{AggregateRoot, DomainEvent};
pub use error::{DomainError, RepositoryError};
