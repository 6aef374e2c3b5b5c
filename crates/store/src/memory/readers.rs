//! Read-port implementations over the in-memory repositories.

use app::read::{
    CartDetail, CartReader, CatalogReader, CategorySummary, OrderDetail, OrderReader,
    OrderSummary, ProductDetail, UserDetail, UserReader,
};
use async_trait::async_trait;
use common::{CartId, OrderId, ProductId, UserId};
use domain::RepositoryError;
use domain::catalog::Slug;
use domain::identity::Email;
use domain::repository::{CartRepository, OrderRepository, ProductRepository, UserRepository};

use super::{
    InMemoryCartRepository, InMemoryCategoryRepository, InMemoryOrderRepository,
    InMemoryProductRepository, InMemoryUserRepository,
};

/// One handle answering every read port from the in-memory repositories.
#[derive(Clone)]
pub struct InMemoryReaders {
    products: InMemoryProductRepository,
    categories: InMemoryCategoryRepository,
    carts: InMemoryCartRepository,
    orders: InMemoryOrderRepository,
    users: InMemoryUserRepository,
}

impl InMemoryReaders {
    pub fn new(
        products: InMemoryProductRepository,
        categories: InMemoryCategoryRepository,
        carts: InMemoryCartRepository,
        orders: InMemoryOrderRepository,
        users: InMemoryUserRepository,
    ) -> Self {
        Self {
            products,
            categories,
            carts,
            orders,
            users,
        }
    }
}

#[async_trait]
impl CatalogReader for InMemoryReaders {
    async fn product_detail(
        &self,
        id: ProductId,
    ) -> Result<Option<ProductDetail>, RepositoryError> {
        Ok(self
            .products
            .find(id)
            .await?
            .map(|product| ProductDetail::from_aggregate(&product)))
    }

    async fn product_by_slug(
        &self,
        slug: &str,
    ) -> Result<Option<ProductDetail>, RepositoryError> {
        let Ok(slug) = Slug::parse(slug) else {
            return Ok(None);
        };
        Ok(self
            .products
            .find_by_slug(&slug)
            .await?
            .map(|product| ProductDetail::from_aggregate(&product)))
    }

    async fn list_categories(&self) -> Result<Vec<CategorySummary>, RepositoryError> {
        let mut summaries: Vec<CategorySummary> = self
            .categories
            .all()
            .await
            .iter()
            .map(CategorySummary::from_aggregate)
            .collect();
        summaries.sort_by(|left, right| {
            left.level
                .cmp(&right.level)
                .then_with(|| left.name.cmp(&right.name))
        });
        Ok(summaries)
    }
}

#[async_trait]
impl CartReader for InMemoryReaders {
    async fn cart_detail(&self, id: CartId) -> Result<Option<CartDetail>, RepositoryError> {
        Ok(self
            .carts
            .find(id)
            .await?
            .map(|cart| CartDetail::from_aggregate(&cart)))
    }
}

#[async_trait]
impl OrderReader for InMemoryReaders {
    async fn order_detail(&self, id: OrderId) -> Result<Option<OrderDetail>, RepositoryError> {
        Ok(self
            .orders
            .find(id)
            .await?
            .map(|order| OrderDetail::from_aggregate(&order)))
    }

    async fn orders_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<OrderSummary>, RepositoryError> {
        let mut summaries: Vec<OrderSummary> = self
            .orders
            .all()
            .await
            .iter()
            .filter(|order| order.user_id() == user_id)
            .map(OrderSummary::from_aggregate)
            .collect();
        summaries.sort_by(|left, right| right.placed_at.cmp(&left.placed_at));
        Ok(summaries)
    }
}

#[async_trait]
impl UserReader for InMemoryReaders {
    async fn user_detail(&self, id: UserId) -> Result<Option<UserDetail>, RepositoryError> {
        Ok(self
            .users
            .find(id)
            .await?
            .map(|user| UserDetail::from_aggregate(&user)))
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<UserDetail>, RepositoryError> {
        let Ok(email) = Email::parse(email) else {
            return Ok(None);
        };
        Ok(self
            .users
            .find_by_email(&email)
            .await?
            .map(|user| UserDetail::from_aggregate(&user)))
    }
}

#[cfg(test)]
mod tests {
    use common::{Currency, Metadata, Money};
    use domain::catalog::Category;
    use domain::repository::CategoryRepository;

    use super::*;

    fn readers() -> (InMemoryReaders, InMemoryProductRepository, InMemoryCategoryRepository) {
        let products = InMemoryProductRepository::new();
        let categories = InMemoryCategoryRepository::new();
        let readers = InMemoryReaders::new(
            products.clone(),
            categories.clone(),
            InMemoryCartRepository::new(),
            InMemoryOrderRepository::new(),
            InMemoryUserRepository::new(),
        );
        (readers, products, categories)
    }

    #[tokio::test]
    async fn test_product_lookup_by_slug() {
        let (readers, products, _) = readers();
        let mut product = domain::catalog::Product::create(
            "Widget",
            Slug::parse("widget").unwrap(),
            "A widget",
            Money::from_cents(1999, Currency::Usd),
            None,
            Metadata::new(),
        )
        .unwrap();
        products.save(&mut product).await.unwrap();

        let detail = readers.product_by_slug("widget").await.unwrap().unwrap();
        assert_eq!(detail.id, product.id());

        assert!(readers.product_by_slug("missing").await.unwrap().is_none());
        assert!(
            readers
                .product_by_slug("NOT A SLUG!")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_categories_listed_parents_first() {
        let (readers, _, categories) = readers();
        let mut parent =
            Category::create("Apparel", Slug::parse("apparel").unwrap(), None).unwrap();
        categories.save(&mut parent).await.unwrap();
        let mut child =
            Category::create("Shoes", Slug::parse("shoes").unwrap(), Some(&parent)).unwrap();
        categories.save(&mut child).await.unwrap();

        let listed = readers.list_categories().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].slug, "apparel");
        assert_eq!(listed[1].slug, "shoes");
    }
}
