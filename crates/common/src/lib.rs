//! Shared kernel for the commerce platform.
//!
//! This crate provides the primitive types every other crate builds on:
//! - Typed UUID identifiers for aggregates
//! - `Money` with an explicit `Currency`, stored in integer cents
//! - `Metadata` for free-form key/value annotations
//! - `Version` for optimistic concurrency control

pub mod ids;
pub mod metadata;
pub mod money;
pub mod version;

pub use ids::{AttributeId, CartId, CategoryId, OrderId, ProductId, UserId, VariantId};
pub use metadata::Metadata;
pub use money::{Currency, Money};
pub use version::Version;
