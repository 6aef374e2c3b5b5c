//! In-memory catalog repositories.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{AttributeId, CategoryId, ProductId};
use domain::catalog::{Attribute, Category, Product, Slug};
use domain::repository::{AttributeRepository, CategoryRepository, ProductRepository};
use domain::{AggregateRoot, RepositoryError};
use outbox::{InMemoryOutboxStore, OutboxStore};
use tokio::sync::RwLock;

use super::check_version;
use crate::messages::drain_messages;

#[derive(Clone)]
pub struct InMemoryProductRepository {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
    outbox: InMemoryOutboxStore,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::with_outbox(InMemoryOutboxStore::new())
    }

    /// Shares an outbox store so saves from several repositories land in
    /// one queue, as they would in a single database.
    pub fn with_outbox(outbox: InMemoryOutboxStore) -> Self {
        Self {
            products: Arc::new(RwLock::new(HashMap::new())),
            outbox,
        }
    }

    pub fn outbox(&self) -> &InMemoryOutboxStore {
        &self.outbox
    }
}

impl Default for InMemoryProductRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &Slug) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products
            .values()
            .find(|product| product.slug().as_str() == slug.as_str())
            .cloned())
    }

    async fn slug_exists(&self, slug: &Slug) -> Result<bool, RepositoryError> {
        let products = self.products.read().await;
        Ok(products
            .values()
            .any(|product| product.slug().as_str() == slug.as_str()))
    }

    async fn save(&self, product: &mut Product) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;

        check_version(
            Product::aggregate_type(),
            products.get(&product.id()).map(|stored| stored.version()),
            product.version(),
        )?;
        if products.values().any(|existing| {
            existing.id() != product.id() && existing.slug().as_str() == product.slug().as_str()
        }) {
            return Err(RepositoryError::Duplicate {
                field: "slug",
                value: product.slug().as_str().to_string(),
            });
        }

        let messages = drain_messages(product)?;
        product.set_version(product.version().next());
        products.insert(product.id(), product.clone());
        drop(products);

        self.outbox
            .enqueue(&messages)
            .await
            .map_err(|err| RepositoryError::Backend(err.to_string()))
    }

    async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        self.products.write().await.remove(&id);
        Ok(())
    }
}

#[derive(Clone)]
pub struct InMemoryCategoryRepository {
    categories: Arc<RwLock<HashMap<CategoryId, Category>>>,
    outbox: InMemoryOutboxStore,
}

impl InMemoryCategoryRepository {
    pub fn new() -> Self {
        Self::with_outbox(InMemoryOutboxStore::new())
    }

    pub fn with_outbox(outbox: InMemoryOutboxStore) -> Self {
        Self {
            categories: Arc::new(RwLock::new(HashMap::new())),
            outbox,
        }
    }

    pub(crate) async fn all(&self) -> Vec<Category> {
        self.categories.read().await.values().cloned().collect()
    }
}

impl Default for InMemoryCategoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CategoryRepository for InMemoryCategoryRepository {
    async fn find(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        Ok(self.categories.read().await.get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &Slug) -> Result<Option<Category>, RepositoryError> {
        let categories = self.categories.read().await;
        Ok(categories
            .values()
            .find(|category| category.slug().as_str() == slug.as_str())
            .cloned())
    }

    async fn slug_exists(&self, slug: &Slug) -> Result<bool, RepositoryError> {
        let categories = self.categories.read().await;
        Ok(categories
            .values()
            .any(|category| category.slug().as_str() == slug.as_str()))
    }

    async fn find_children(&self, id: CategoryId) -> Result<Vec<Category>, RepositoryError> {
        let categories = self.categories.read().await;
        Ok(categories
            .values()
            .filter(|category| category.parent_id() == Some(id))
            .cloned()
            .collect())
    }

    async fn save(&self, category: &mut Category) -> Result<(), RepositoryError> {
        let mut categories = self.categories.write().await;

        check_version(
            Category::aggregate_type(),
            categories.get(&category.id()).map(|stored| stored.version()),
            category.version(),
        )?;
        if categories.values().any(|existing| {
            existing.id() != category.id() && existing.slug().as_str() == category.slug().as_str()
        }) {
            return Err(RepositoryError::Duplicate {
                field: "slug",
                value: category.slug().as_str().to_string(),
            });
        }

        let messages = drain_messages(category)?;
        category.set_version(category.version().next());
        categories.insert(category.id(), category.clone());
        drop(categories);

        self.outbox
            .enqueue(&messages)
            .await
            .map_err(|err| RepositoryError::Backend(err.to_string()))
    }

    async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        self.categories.write().await.remove(&id);
        Ok(())
    }
}

#[derive(Clone)]
pub struct InMemoryAttributeRepository {
    attributes: Arc<RwLock<HashMap<AttributeId, Attribute>>>,
    outbox: InMemoryOutboxStore,
}

impl InMemoryAttributeRepository {
    pub fn new() -> Self {
        Self::with_outbox(InMemoryOutboxStore::new())
    }

    pub fn with_outbox(outbox: InMemoryOutboxStore) -> Self {
        Self {
            attributes: Arc::new(RwLock::new(HashMap::new())),
            outbox,
        }
    }
}

impl Default for InMemoryAttributeRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AttributeRepository for InMemoryAttributeRepository {
    async fn find(&self, id: AttributeId) -> Result<Option<Attribute>, RepositoryError> {
        Ok(self.attributes.read().await.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Attribute>, RepositoryError> {
        let attributes = self.attributes.read().await;
        Ok(attributes
            .values()
            .find(|attribute| attribute.name() == name)
            .cloned())
    }

    async fn name_exists(&self, name: &str) -> Result<bool, RepositoryError> {
        let attributes = self.attributes.read().await;
        Ok(attributes.values().any(|attribute| attribute.name() == name))
    }

    async fn save(&self, attribute: &mut Attribute) -> Result<(), RepositoryError> {
        let mut attributes = self.attributes.write().await;

        check_version(
            Attribute::aggregate_type(),
            attributes
                .get(&attribute.id())
                .map(|stored| stored.version()),
            attribute.version(),
        )?;
        if attributes
            .values()
            .any(|existing| existing.id() != attribute.id() && existing.name() == attribute.name())
        {
            return Err(RepositoryError::Duplicate {
                field: "name",
                value: attribute.name().to_string(),
            });
        }

        let messages = drain_messages(attribute)?;
        attribute.set_version(attribute.version().next());
        attributes.insert(attribute.id(), attribute.clone());
        drop(attributes);

        self.outbox
            .enqueue(&messages)
            .await
            .map_err(|err| RepositoryError::Backend(err.to_string()))
    }
}
