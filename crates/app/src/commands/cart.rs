//! Cart commands.

use std::sync::Arc;

use async_trait::async_trait;
use common::{CartId, Currency, Metadata, ProductId, UserId, VariantId};
use domain::AggregateRoot;
use domain::cart::Cart;
use domain::catalog::Product;
use domain::repository::{CartRepository, ProductRepository};

use crate::error::AppError;
use crate::mediator::{Command, CommandHandler};

pub struct CreateCart {
    /// `None` starts an anonymous cart that can be claimed at login.
    pub user_id: Option<UserId>,
    pub currency: Currency,
    pub metadata: Metadata,
}

impl Command for CreateCart {
    type Output = CartId;
}

pub struct CreateCartHandler {
    carts: Arc<dyn CartRepository>,
}

impl CreateCartHandler {
    pub fn new(carts: Arc<dyn CartRepository>) -> Self {
        Self { carts }
    }
}

#[async_trait]
impl CommandHandler<CreateCart> for CreateCartHandler {
    async fn handle(&self, command: CreateCart) -> Result<CartId, AppError> {
        let mut cart = Cart::create(command.user_id, command.currency, command.metadata);
        self.carts.save(&mut cart).await?;
        Ok(cart.id())
    }
}

/// Adds a line, snapshotting the product name and effective price at the
/// moment of the request.
pub struct AddCartItem {
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
}

impl Command for AddCartItem {
    type Output = ();
}

pub struct AddCartItemHandler {
    carts: Arc<dyn CartRepository>,
    products: Arc<dyn ProductRepository>,
}

impl AddCartItemHandler {
    pub fn new(carts: Arc<dyn CartRepository>, products: Arc<dyn ProductRepository>) -> Self {
        Self { carts, products }
    }
}

#[async_trait]
impl CommandHandler<AddCartItem> for AddCartItemHandler {
    #[tracing::instrument(skip(self, command), fields(cart_id = %command.cart_id, product_id = %command.product_id))]
    async fn handle(&self, command: AddCartItem) -> Result<(), AppError> {
        let mut cart = find_cart(&self.carts, command.cart_id).await?;
        let product = self
            .products
            .find(command.product_id)
            .await?
            .ok_or_else(|| AppError::not_found("product", command.product_id))?;

        if !product.status().is_sellable() {
            return Err(AppError::Validation(format!(
                "product {} is not for sale",
                product.slug().as_str()
            )));
        }
        if let Some(variant_id) = command.variant_id {
            validate_variant(&product, variant_id, command.quantity)?;
        }

        let unit_price = product.effective_price(command.variant_id)?;
        cart.add_item(
            command.product_id,
            command.variant_id,
            product.name(),
            unit_price,
            command.quantity,
        )?;
        self.carts.save(&mut cart).await?;
        Ok(())
    }
}

/// Checks the variant is sellable and has the stock to cover the request.
/// Stock is only reserved at checkout; this guards against carts that can
/// never convert.
fn validate_variant(
    product: &Product,
    variant_id: VariantId,
    quantity: u32,
) -> Result<(), AppError> {
    let variant = product
        .variant(variant_id)
        .ok_or_else(|| AppError::not_found("variant", variant_id))?;
    if !variant.is_active() {
        return Err(AppError::Validation(format!(
            "variant {} is not for sale",
            variant.sku().as_str()
        )));
    }
    if variant.stock().available() < quantity {
        return Err(AppError::Validation(format!(
            "variant {} has only {} available",
            variant.sku().as_str(),
            variant.stock().available()
        )));
    }
    Ok(())
}

pub struct UpdateCartItemQuantity {
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    /// Zero removes the line.
    pub quantity: u32,
}

impl Command for UpdateCartItemQuantity {
    type Output = ();
}

pub struct UpdateCartItemQuantityHandler {
    carts: Arc<dyn CartRepository>,
}

impl UpdateCartItemQuantityHandler {
    pub fn new(carts: Arc<dyn CartRepository>) -> Self {
        Self { carts }
    }
}

#[async_trait]
impl CommandHandler<UpdateCartItemQuantity> for UpdateCartItemQuantityHandler {
    async fn handle(&self, command: UpdateCartItemQuantity) -> Result<(), AppError> {
        let mut cart = find_cart(&self.carts, command.cart_id).await?;
        cart.update_quantity(command.product_id, command.variant_id, command.quantity)?;
        // An unchanged quantity records nothing; skip the version bump.
        if cart.pending_events().is_empty() {
            return Ok(());
        }
        self.carts.save(&mut cart).await?;
        Ok(())
    }
}

pub struct RemoveCartItem {
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
}

impl Command for RemoveCartItem {
    type Output = ();
}

pub struct RemoveCartItemHandler {
    carts: Arc<dyn CartRepository>,
}

impl RemoveCartItemHandler {
    pub fn new(carts: Arc<dyn CartRepository>) -> Self {
        Self { carts }
    }
}

#[async_trait]
impl CommandHandler<RemoveCartItem> for RemoveCartItemHandler {
    async fn handle(&self, command: RemoveCartItem) -> Result<(), AppError> {
        let mut cart = find_cart(&self.carts, command.cart_id).await?;
        cart.remove_item(command.product_id, command.variant_id)?;
        self.carts.save(&mut cart).await?;
        Ok(())
    }
}

pub struct ClearCart {
    pub cart_id: CartId,
}

impl Command for ClearCart {
    type Output = ();
}

pub struct ClearCartHandler {
    carts: Arc<dyn CartRepository>,
}

impl ClearCartHandler {
    pub fn new(carts: Arc<dyn CartRepository>) -> Self {
        Self { carts }
    }
}

#[async_trait]
impl CommandHandler<ClearCart> for ClearCartHandler {
    async fn handle(&self, command: ClearCart) -> Result<(), AppError> {
        let mut cart = find_cart(&self.carts, command.cart_id).await?;
        cart.clear();
        if cart.pending_events().is_empty() {
            return Ok(());
        }
        self.carts.save(&mut cart).await?;
        Ok(())
    }
}

/// Claims an anonymous cart at login. Idempotent for the same user.
pub struct AssignCartToUser {
    pub cart_id: CartId,
    pub user_id: UserId,
}

impl Command for AssignCartToUser {
    type Output = ();
}

pub struct AssignCartToUserHandler {
    carts: Arc<dyn CartRepository>,
}

impl AssignCartToUserHandler {
    pub fn new(carts: Arc<dyn CartRepository>) -> Self {
        Self { carts }
    }
}

#[async_trait]
impl CommandHandler<AssignCartToUser> for AssignCartToUserHandler {
    #[tracing::instrument(skip(self, command), fields(cart_id = %command.cart_id, user_id = %command.user_id))]
    async fn handle(&self, command: AssignCartToUser) -> Result<(), AppError> {
        let mut cart = find_cart(&self.carts, command.cart_id).await?;
        cart.assign_to_user(command.user_id)?;
        if cart.pending_events().is_empty() {
            return Ok(());
        }
        self.carts.save(&mut cart).await?;
        Ok(())
    }
}

async fn find_cart(carts: &Arc<dyn CartRepository>, cart_id: CartId) -> Result<Cart, AppError> {
    carts
        .find(cart_id)
        .await?
        .ok_or_else(|| AppError::not_found("cart", cart_id))
}
