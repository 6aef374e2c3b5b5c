//! PostgreSQL persistence.
//!
//! Each aggregate table stores the serialized aggregate as a JSONB
//! `document` next to extracted columns used for lookups, uniqueness and
//! the admin datatables. Saves run in one transaction: a version-guarded
//! write of the row plus the drained events into the outbox.

mod cart;
mod catalog;
mod order;
mod readers;
mod tables;
mod user;

pub use cart::PostgresCartRepository;
pub use catalog::{
    PostgresAttributeRepository, PostgresCategoryRepository, PostgresProductRepository,
};
pub use order::PostgresOrderRepository;
pub use readers::PostgresReaders;
pub use tables::PostgresTables;
pub use user::PostgresUserRepository;

use common::Version;
use domain::RepositoryError;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Opens a connection pool against the given database URL.
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Runs the database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}

pub(crate) fn backend(err: sqlx::Error) -> RepositoryError {
    RepositoryError::Backend(err.to_string())
}

/// Maps unique violations on the table's natural key to `Duplicate`;
/// everything else is a backend error.
pub(crate) fn save_error(
    err: sqlx::Error,
    field: &'static str,
    value: &str,
) -> RepositoryError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return RepositoryError::Duplicate {
                field,
                value: value.to_string(),
            };
        }
    }
    backend(err)
}

/// The version currently stored for a row, `initial` when the row is gone.
pub(crate) async fn stored_version(
    tx: &mut Transaction<'_, Postgres>,
    table: &'static str,
    id: Uuid,
) -> Result<Version, RepositoryError> {
    let version: Option<i64> =
        sqlx::query_scalar(&format!("SELECT version FROM {table} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(backend)?;
    Ok(version.map(Version::new).unwrap_or_else(Version::initial))
}
