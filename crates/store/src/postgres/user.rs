//! PostgreSQL user repository.

use async_trait::async_trait;
use common::{UserId, Version};
use domain::identity::{Email, User};
use domain::repository::UserRepository;
use domain::{AggregateRoot, RepositoryError};
use outbox::enqueue_in_tx;
use sqlx::{PgPool, Row, postgres::PgRow};

use super::{backend, save_error, stored_version};
use crate::messages::drain_messages;

#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_user(row: PgRow) -> Result<User, RepositoryError> {
    let document: serde_json::Value = row.try_get("document").map_err(backend)?;
    let version: i64 = row.try_get("version").map_err(backend)?;
    let mut user: User = serde_json::from_value(document)?;
    user.set_version(Version::new(version));
    Ok(user)
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        sqlx::query("SELECT document, version FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .map(row_to_user)
            .transpose()
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        sqlx::query("SELECT document, version FROM users WHERE email = $1")
            .bind(email.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .map(row_to_user)
            .transpose()
    }

    async fn email_exists(&self, email: &Email) -> Result<bool, RepositoryError> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
            .bind(email.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(backend)
    }

    #[tracing::instrument(skip(self, user), fields(user_id = %user.id()))]
    async fn save(&self, user: &mut User) -> Result<(), RepositoryError> {
        let expected = user.version();
        let messages = drain_messages(user)?;
        user.set_version(expected.next());
        let document = serde_json::to_value(&*user)?;

        let mut tx = self.pool.begin().await.map_err(backend)?;
        if expected == Version::initial() {
            sqlx::query(
                r#"
                INSERT INTO users
                    (id, version, email, role, status, document, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(user.id().as_uuid())
            .bind(user.version().as_i64())
            .bind(user.email().as_str())
            .bind(user.role().as_str())
            .bind(user.status().as_str())
            .bind(&document)
            .bind(user.created_at())
            .bind(user.updated_at())
            .execute(&mut *tx)
            .await
            .map_err(|err| save_error(err, "email", user.email().as_str()))?;
        } else {
            let result = sqlx::query(
                r#"
                UPDATE users
                SET version = $2, email = $3, role = $4, status = $5,
                    document = $6, updated_at = $7
                WHERE id = $1 AND version = $8
                "#,
            )
            .bind(user.id().as_uuid())
            .bind(user.version().as_i64())
            .bind(user.email().as_str())
            .bind(user.role().as_str())
            .bind(user.status().as_str())
            .bind(&document)
            .bind(user.updated_at())
            .bind(expected.as_i64())
            .execute(&mut *tx)
            .await
            .map_err(|err| save_error(err, "email", user.email().as_str()))?;

            if result.rows_affected() == 0 {
                let actual = stored_version(&mut tx, "users", user.id().as_uuid()).await?;
                return Err(RepositoryError::Conflict {
                    aggregate_type: User::aggregate_type(),
                    expected,
                    actual,
                });
            }
        }

        enqueue_in_tx(&mut tx, &messages)
            .await
            .map_err(|err| RepositoryError::Backend(err.to_string()))?;
        tx.commit().await.map_err(backend)
    }
}
