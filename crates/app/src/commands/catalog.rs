//! Catalog commands: products, variants, stock, categories, attributes.

use std::sync::Arc;

use async_trait::async_trait;
use common::{AttributeId, CategoryId, Metadata, Money, ProductId, VariantId};
use domain::RepositoryError;
use domain::catalog::{
    Attribute, AttributeKind, Category, Product, ProductStatus, Sku, Slug, VariantAttribute,
};
use domain::repository::{AttributeRepository, CategoryRepository, ProductRepository};

use crate::error::AppError;
use crate::mediator::{Command, CommandHandler};

pub struct CreateProduct {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub base_price: Money,
    /// When set, a default variant carrying this SKU is created with the
    /// product so single-SKU products are stock-tracked from the start.
    pub initial_sku: Option<String>,
    pub metadata: Metadata,
}

impl Command for CreateProduct {
    type Output = ProductId;
}

pub struct CreateProductHandler {
    products: Arc<dyn ProductRepository>,
}

impl CreateProductHandler {
    pub fn new(products: Arc<dyn ProductRepository>) -> Self {
        Self { products }
    }
}

#[async_trait]
impl CommandHandler<CreateProduct> for CreateProductHandler {
    #[tracing::instrument(skip(self, command), fields(slug = %command.slug))]
    async fn handle(&self, command: CreateProduct) -> Result<ProductId, AppError> {
        let slug = Slug::parse(command.slug)?;
        if self.products.slug_exists(&slug).await? {
            return Err(RepositoryError::Duplicate {
                field: "slug",
                value: slug.as_str().to_string(),
            }
            .into());
        }
        let initial_sku = command.initial_sku.map(Sku::parse).transpose()?;

        let mut product = Product::create(
            command.name,
            slug,
            command.description,
            command.base_price,
            initial_sku,
            command.metadata,
        )?;
        self.products.save(&mut product).await?;

        tracing::info!(product_id = %product.id(), "product created");
        Ok(product.id())
    }
}

pub struct UpdateProductDetails {
    pub product_id: ProductId,
    pub name: String,
    pub description: String,
}

impl Command for UpdateProductDetails {
    type Output = ();
}

pub struct UpdateProductDetailsHandler {
    products: Arc<dyn ProductRepository>,
}

impl UpdateProductDetailsHandler {
    pub fn new(products: Arc<dyn ProductRepository>) -> Self {
        Self { products }
    }
}

#[async_trait]
impl CommandHandler<UpdateProductDetails> for UpdateProductDetailsHandler {
    async fn handle(&self, command: UpdateProductDetails) -> Result<(), AppError> {
        let mut product = find_product(&self.products, command.product_id).await?;
        product.update_details(command.name, command.description)?;
        self.products.save(&mut product).await?;
        Ok(())
    }
}

pub struct ChangeProductPrice {
    pub product_id: ProductId,
    pub price: Money,
}

impl Command for ChangeProductPrice {
    type Output = ();
}

pub struct ChangeProductPriceHandler {
    products: Arc<dyn ProductRepository>,
}

impl ChangeProductPriceHandler {
    pub fn new(products: Arc<dyn ProductRepository>) -> Self {
        Self { products }
    }
}

#[async_trait]
impl CommandHandler<ChangeProductPrice> for ChangeProductPriceHandler {
    async fn handle(&self, command: ChangeProductPrice) -> Result<(), AppError> {
        let mut product = find_product(&self.products, command.product_id).await?;
        product.change_price(command.price)?;
        self.products.save(&mut product).await?;
        Ok(())
    }
}

pub struct SetProductStatus {
    pub product_id: ProductId,
    pub status: ProductStatus,
}

impl Command for SetProductStatus {
    type Output = ();
}

pub struct SetProductStatusHandler {
    products: Arc<dyn ProductRepository>,
}

impl SetProductStatusHandler {
    pub fn new(products: Arc<dyn ProductRepository>) -> Self {
        Self { products }
    }
}

#[async_trait]
impl CommandHandler<SetProductStatus> for SetProductStatusHandler {
    #[tracing::instrument(skip(self, command), fields(product_id = %command.product_id))]
    async fn handle(&self, command: SetProductStatus) -> Result<(), AppError> {
        let mut product = find_product(&self.products, command.product_id).await?;
        product.set_status(command.status)?;
        self.products.save(&mut product).await?;
        Ok(())
    }
}

pub struct AssignProductCategory {
    pub product_id: ProductId,
    pub category_id: CategoryId,
}

impl Command for AssignProductCategory {
    type Output = ();
}

pub struct AssignProductCategoryHandler {
    products: Arc<dyn ProductRepository>,
    categories: Arc<dyn CategoryRepository>,
}

impl AssignProductCategoryHandler {
    pub fn new(
        products: Arc<dyn ProductRepository>,
        categories: Arc<dyn CategoryRepository>,
    ) -> Self {
        Self {
            products,
            categories,
        }
    }
}

#[async_trait]
impl CommandHandler<AssignProductCategory> for AssignProductCategoryHandler {
    async fn handle(&self, command: AssignProductCategory) -> Result<(), AppError> {
        // The category must exist before a product may point at it.
        if self.categories.find(command.category_id).await?.is_none() {
            return Err(AppError::not_found("category", command.category_id));
        }

        let mut product = find_product(&self.products, command.product_id).await?;
        product.assign_category(command.category_id)?;
        self.products.save(&mut product).await?;
        Ok(())
    }
}

pub struct RemoveProductCategory {
    pub product_id: ProductId,
    pub category_id: CategoryId,
}

impl Command for RemoveProductCategory {
    type Output = ();
}

pub struct RemoveProductCategoryHandler {
    products: Arc<dyn ProductRepository>,
}

impl RemoveProductCategoryHandler {
    pub fn new(products: Arc<dyn ProductRepository>) -> Self {
        Self { products }
    }
}

#[async_trait]
impl CommandHandler<RemoveProductCategory> for RemoveProductCategoryHandler {
    async fn handle(&self, command: RemoveProductCategory) -> Result<(), AppError> {
        let mut product = find_product(&self.products, command.product_id).await?;
        product.remove_category(command.category_id)?;
        self.products.save(&mut product).await?;
        Ok(())
    }
}

pub struct AddVariant {
    pub product_id: ProductId,
    pub sku: String,
    /// `None` sells at the product's base price.
    pub price: Option<Money>,
    pub attributes: Vec<VariantAttribute>,
    pub initial_stock: u32,
    pub metadata: Metadata,
}

impl Command for AddVariant {
    type Output = VariantId;
}

pub struct AddVariantHandler {
    products: Arc<dyn ProductRepository>,
}

impl AddVariantHandler {
    pub fn new(products: Arc<dyn ProductRepository>) -> Self {
        Self { products }
    }
}

#[async_trait]
impl CommandHandler<AddVariant> for AddVariantHandler {
    #[tracing::instrument(skip(self, command), fields(product_id = %command.product_id, sku = %command.sku))]
    async fn handle(&self, command: AddVariant) -> Result<VariantId, AppError> {
        let sku = Sku::parse(command.sku)?;
        let mut product = find_product(&self.products, command.product_id).await?;
        let variant_id = product.add_variant(
            sku,
            command.price,
            command.attributes,
            command.initial_stock,
            command.metadata,
        )?;
        self.products.save(&mut product).await?;
        Ok(variant_id)
    }
}

pub struct UpdateVariantPrice {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    /// `None` reverts to the base price.
    pub price: Option<Money>,
}

impl Command for UpdateVariantPrice {
    type Output = ();
}

pub struct UpdateVariantPriceHandler {
    products: Arc<dyn ProductRepository>,
}

impl UpdateVariantPriceHandler {
    pub fn new(products: Arc<dyn ProductRepository>) -> Self {
        Self { products }
    }
}

#[async_trait]
impl CommandHandler<UpdateVariantPrice> for UpdateVariantPriceHandler {
    async fn handle(&self, command: UpdateVariantPrice) -> Result<(), AppError> {
        let mut product = find_product(&self.products, command.product_id).await?;
        product.update_variant_price(command.variant_id, command.price)?;
        self.products.save(&mut product).await?;
        Ok(())
    }
}

/// Operator stock correction by a signed delta.
pub struct AdjustStock {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub delta: i64,
}

impl Command for AdjustStock {
    /// The resulting on-hand count.
    type Output = u32;
}

pub struct AdjustStockHandler {
    products: Arc<dyn ProductRepository>,
}

impl AdjustStockHandler {
    pub fn new(products: Arc<dyn ProductRepository>) -> Self {
        Self { products }
    }
}

#[async_trait]
impl CommandHandler<AdjustStock> for AdjustStockHandler {
    #[tracing::instrument(skip(self, command), fields(variant_id = %command.variant_id, delta = command.delta))]
    async fn handle(&self, command: AdjustStock) -> Result<u32, AppError> {
        let mut product = find_product(&self.products, command.product_id).await?;
        let on_hand = product.adjust_stock(command.variant_id, command.delta)?;
        self.products.save(&mut product).await?;
        Ok(on_hand)
    }
}

pub struct CreateCategory {
    pub name: String,
    pub slug: String,
    pub parent_id: Option<CategoryId>,
}

impl Command for CreateCategory {
    type Output = CategoryId;
}

pub struct CreateCategoryHandler {
    categories: Arc<dyn CategoryRepository>,
}

impl CreateCategoryHandler {
    pub fn new(categories: Arc<dyn CategoryRepository>) -> Self {
        Self { categories }
    }
}

#[async_trait]
impl CommandHandler<CreateCategory> for CreateCategoryHandler {
    #[tracing::instrument(skip(self, command), fields(slug = %command.slug))]
    async fn handle(&self, command: CreateCategory) -> Result<CategoryId, AppError> {
        let slug = Slug::parse(command.slug)?;
        if self.categories.slug_exists(&slug).await? {
            return Err(RepositoryError::Duplicate {
                field: "slug",
                value: slug.as_str().to_string(),
            }
            .into());
        }

        let parent = match command.parent_id {
            Some(parent_id) => Some(
                self.categories
                    .find(parent_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("category", parent_id))?,
            ),
            None => None,
        };

        let mut category = Category::create(command.name, slug, parent.as_ref())?;
        self.categories.save(&mut category).await?;
        Ok(category.id())
    }
}

/// Reparents a category and relevels its descendants.
pub struct MoveCategory {
    pub category_id: CategoryId,
    /// `None` makes the category a root.
    pub new_parent_id: Option<CategoryId>,
}

impl Command for MoveCategory {
    type Output = ();
}

pub struct MoveCategoryHandler {
    categories: Arc<dyn CategoryRepository>,
}

impl MoveCategoryHandler {
    pub fn new(categories: Arc<dyn CategoryRepository>) -> Self {
        Self { categories }
    }
}

#[async_trait]
impl CommandHandler<MoveCategory> for MoveCategoryHandler {
    #[tracing::instrument(skip(self, command), fields(category_id = %command.category_id))]
    async fn handle(&self, command: MoveCategory) -> Result<(), AppError> {
        if command.new_parent_id == Some(command.category_id) {
            return Err(AppError::Validation(
                "a category cannot be its own parent".to_string(),
            ));
        }

        let mut category = self
            .categories
            .find(command.category_id)
            .await?
            .ok_or_else(|| AppError::not_found("category", command.category_id))?;

        let parent = match command.new_parent_id {
            Some(parent_id) => {
                let parent = self
                    .categories
                    .find(parent_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("category", parent_id))?;
                // Reparenting under a descendant would detach the subtree
                // into a cycle; walk the ancestor chain to rule it out.
                if self.is_descendant(parent_id, command.category_id).await? {
                    return Err(AppError::Validation(
                        "a category cannot move under its own descendant".to_string(),
                    ));
                }
                Some(parent)
            }
            None => None,
        };

        category.move_under(parent.as_ref())?;
        self.categories.save(&mut category).await?;
        self.relevel_descendants(category).await?;
        Ok(())
    }
}

impl MoveCategoryHandler {
    /// Whether `candidate` sits somewhere below `ancestor`.
    async fn is_descendant(
        &self,
        candidate: CategoryId,
        ancestor: CategoryId,
    ) -> Result<bool, AppError> {
        let mut cursor = Some(candidate);
        while let Some(current) = cursor {
            if current == ancestor {
                return Ok(true);
            }
            cursor = match self.categories.find(current).await? {
                Some(category) => category.parent_id(),
                None => None,
            };
        }
        Ok(false)
    }

    /// Breadth-first pass fixing `level` on everything below the moved node.
    async fn relevel_descendants(&self, root: Category) -> Result<(), AppError> {
        let mut queue = vec![root];
        while let Some(parent) = queue.pop() {
            for mut child in self.categories.find_children(parent.id()).await? {
                child.relevel(Some(&parent));
                self.categories.save(&mut child).await?;
                queue.push(child);
            }
        }
        Ok(())
    }
}

pub struct CreateAttribute {
    /// Machine identifier, snake_case, immutable after creation.
    pub name: String,
    pub display_name: String,
    pub kind: AttributeKind,
    pub filterable: bool,
    pub searchable: bool,
    pub variant_defining: bool,
}

impl Command for CreateAttribute {
    type Output = AttributeId;
}

pub struct CreateAttributeHandler {
    attributes: Arc<dyn AttributeRepository>,
}

impl CreateAttributeHandler {
    pub fn new(attributes: Arc<dyn AttributeRepository>) -> Self {
        Self { attributes }
    }
}

#[async_trait]
impl CommandHandler<CreateAttribute> for CreateAttributeHandler {
    #[tracing::instrument(skip(self, command), fields(name = %command.name))]
    async fn handle(&self, command: CreateAttribute) -> Result<AttributeId, AppError> {
        if self.attributes.name_exists(&command.name).await? {
            return Err(RepositoryError::Duplicate {
                field: "name",
                value: command.name,
            }
            .into());
        }

        let mut attribute = Attribute::create(command.name, command.display_name, command.kind)?;
        if command.filterable || command.searchable || command.variant_defining {
            attribute.set_flags(
                command.filterable,
                command.searchable,
                command.variant_defining,
            );
        }
        self.attributes.save(&mut attribute).await?;
        Ok(attribute.id())
    }
}

async fn find_product(
    products: &Arc<dyn ProductRepository>,
    product_id: ProductId,
) -> Result<Product, AppError> {
    products
        .find(product_id)
        .await?
        .ok_or_else(|| AppError::not_found("product", product_id))
}
