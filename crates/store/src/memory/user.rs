//! In-memory user repository.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::UserId;
use domain::identity::{Email, User};
use domain::repository::UserRepository;
use domain::{AggregateRoot, RepositoryError};
use outbox::{InMemoryOutboxStore, OutboxStore};
use tokio::sync::RwLock;

use super::check_version;
use crate::messages::drain_messages;

#[derive(Clone)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<UserId, User>>>,
    outbox: InMemoryOutboxStore,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::with_outbox(InMemoryOutboxStore::new())
    }

    pub fn with_outbox(outbox: InMemoryOutboxStore) -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            outbox,
        }
    }
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|user| user.email().as_str() == email.as_str())
            .cloned())
    }

    async fn email_exists(&self, email: &Email) -> Result<bool, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.values().any(|user| user.email().as_str() == email.as_str()))
    }

    async fn save(&self, user: &mut User) -> Result<(), RepositoryError> {
        let mut users = self.users.write().await;

        check_version(
            User::aggregate_type(),
            users.get(&user.id()).map(|stored| stored.version()),
            user.version(),
        )?;
        if users.values().any(|existing| {
            existing.id() != user.id() && existing.email().as_str() == user.email().as_str()
        }) {
            return Err(RepositoryError::Duplicate {
                field: "email",
                value: user.email().as_str().to_string(),
            });
        }

        let messages = drain_messages(user)?;
        user.set_version(user.version().next());
        users.insert(user.id(), user.clone());
        drop(users);

        self.outbox
            .enqueue(&messages)
            .await
            .map_err(|err| RepositoryError::Backend(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::identity::PasswordHash;

    fn registered(email: &str) -> User {
        User::register(
            Email::parse(email).unwrap(),
            PasswordHash::parse("$argon2id$stub").unwrap(),
            "Ada",
            "Lovelace",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_find_by_email_is_case_normalized() {
        let repo = InMemoryUserRepository::new();
        let mut user = registered("Ada@Example.com");
        repo.save(&mut user).await.unwrap();

        let probe = Email::parse("ada@example.com").unwrap();
        let found = repo.find_by_email(&probe).await.unwrap().unwrap();
        assert_eq!(found.id(), user.id());
        assert!(repo.email_exists(&probe).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let repo = InMemoryUserRepository::new();
        let mut first = registered("ada@example.com");
        repo.save(&mut first).await.unwrap();

        let mut second = registered("ada@example.com");
        let err = repo.save(&mut second).await.unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::Duplicate { field: "email", .. }
        ));
    }
}
