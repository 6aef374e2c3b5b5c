//! Application layer.
//!
//! Commands and queries are dispatched through the [`Mediator`]; one handler
//! per operation loads aggregates through the `domain` ports, invokes them
//! and saves. Queries go through read-side ports returning DTOs, never
//! aggregates. The [`consumers`] module holds the in-memory read models fed
//! by the outbox processor.

pub mod commands;
pub mod config;
pub mod consumers;
pub mod datatable;
pub mod error;
pub mod mediator;
pub mod queries;
pub mod read;

pub use config::AppConfig;
pub use datatable::{
    AdminTable, AdminTables, ColumnKind, DataTableError, DataTableRequest, DataTableResponse,
    Filter, FilterOp, FilterValue, Sort,
};
pub use error::AppError;
pub use mediator::{Command, CommandHandler, Mediator, MediatorBuilder, Query, QueryHandler};
