//! CQRS dispatch.
//!
//! Commands mutate state and queries read it; both are plain structs
//! dispatched by type through the [`Mediator`]. Handlers register once at
//! startup, the mediator is cheap to clone and hand to every caller.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AppError;

/// A request that changes state.
pub trait Command: Send + 'static {
    type Output: Send;
}

/// A request that only reads state.
pub trait Query: Send + 'static {
    type Output: Send;
}

/// Handles one command type.
#[async_trait]
pub trait CommandHandler<C: Command>: Send + Sync {
    async fn handle(&self, command: C) -> Result<C::Output, AppError>;
}

/// Handles one query type.
#[async_trait]
pub trait QueryHandler<Q: Query>: Send + Sync {
    async fn handle(&self, query: Q) -> Result<Q::Output, AppError>;
}

/// Builds the handler registries.
///
/// Each entry erases the concrete handler behind `Any` keyed by the
/// command/query `TypeId`; [`Mediator::send`] downcasts back to the typed
/// handler, so dispatch never guesses at payload shapes.
#[derive(Default)]
pub struct MediatorBuilder {
    commands: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    queries: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl MediatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command handler, replacing any previous one for `C`.
    pub fn command<C, H>(mut self, handler: H) -> Self
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        let handler: Arc<dyn CommandHandler<C>> = Arc::new(handler);
        self.commands.insert(TypeId::of::<C>(), Box::new(handler));
        self
    }

    /// Registers a query handler, replacing any previous one for `Q`.
    pub fn query<Q, H>(mut self, handler: H) -> Self
    where
        Q: Query,
        H: QueryHandler<Q> + 'static,
    {
        let handler: Arc<dyn QueryHandler<Q>> = Arc::new(handler);
        self.queries.insert(TypeId::of::<Q>(), Box::new(handler));
        self
    }

    pub fn build(self) -> Mediator {
        Mediator {
            commands: Arc::new(self.commands),
            queries: Arc::new(self.queries),
        }
    }
}

/// Routes commands and queries to their registered handlers.
#[derive(Clone)]
pub struct Mediator {
    commands: Arc<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
    queries: Arc<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

impl Mediator {
    pub fn builder() -> MediatorBuilder {
        MediatorBuilder::new()
    }

    /// Dispatches a command to its handler.
    pub async fn send<C: Command>(&self, command: C) -> Result<C::Output, AppError> {
        let handler = self
            .commands
            .get(&TypeId::of::<C>())
            .and_then(|any| any.downcast_ref::<Arc<dyn CommandHandler<C>>>())
            .ok_or(AppError::HandlerNotRegistered(std::any::type_name::<C>()))?;
        handler.handle(command).await
    }

    /// Dispatches a query to its handler.
    pub async fn query<Q: Query>(&self, query: Q) -> Result<Q::Output, AppError> {
        let handler = self
            .queries
            .get(&TypeId::of::<Q>())
            .and_then(|any| any.downcast_ref::<Arc<dyn QueryHandler<Q>>>())
            .ok_or(AppError::HandlerNotRegistered(std::any::type_name::<Q>()))?;
        handler.handle(query).await
    }

    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    pub fn query_count(&self) -> usize {
        self.queries.len()
    }
}
