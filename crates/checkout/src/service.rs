//! Checkout orchestration over carts, stock, payment and shipping.

use std::collections::HashMap;
use std::sync::Arc;

use common::{CartId, Metadata, Money, OrderId, ProductId, VariantId};
use domain::{Address, AggregateRoot};
use domain::catalog::{CatalogError, Product};
use domain::order::{Order, OrderItem, OrderStatus, PaymentMethod};
use domain::repository::{CartRepository, OrderRepository, ProductRepository};

use crate::error::CheckoutError;
use crate::services::payment::PaymentGateway;
use crate::services::shipping::ShippingProvider;

/// Outcome of a placed order.
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub order_id: OrderId,
    /// Grand total: subtotal, tax and shipping.
    pub total: Money,
    /// `None` when the charge was declined. The order then stays `Pending`
    /// with a failed payment and its stock reservations are released, so the
    /// buyer can retry with [`CheckoutService::pay_order`].
    pub transaction_id: Option<String>,
}

/// One reservation taken during checkout, kept for compensation.
#[derive(Debug, Clone, Copy)]
struct ReservedLine {
    product_id: ProductId,
    variant_id: VariantId,
    quantity: u32,
}

/// Drives the order lifecycle against the catalog, the payment gateway and
/// the shipping provider.
///
/// Each step mutates aggregates in memory first and persists only once the
/// step is known to succeed; failures after a persisted step run compensating
/// actions in reverse order.
pub struct CheckoutService<G, S>
where
    G: PaymentGateway,
    S: ShippingProvider,
{
    products: Arc<dyn ProductRepository>,
    carts: Arc<dyn CartRepository>,
    orders: Arc<dyn OrderRepository>,
    gateway: G,
    shipping: S,
    tax_basis_points: u32,
}

impl<G, S> CheckoutService<G, S>
where
    G: PaymentGateway,
    S: ShippingProvider,
{
    /// Creates a new checkout service.
    ///
    /// `tax_basis_points` is the flat sales tax applied to the subtotal,
    /// in basis points (825 = 8.25%).
    pub fn new(
        products: Arc<dyn ProductRepository>,
        carts: Arc<dyn CartRepository>,
        orders: Arc<dyn OrderRepository>,
        gateway: G,
        shipping: S,
        tax_basis_points: u32,
    ) -> Self {
        Self {
            products,
            carts,
            orders,
            gateway,
            shipping,
            tax_basis_points,
        }
    }

    /// Places an order from a cart and charges the buyer.
    ///
    /// Reserves stock for every cart line, quotes shipping, snapshots the
    /// lines into an order and charges the gateway. On a declined charge the
    /// order is kept with a failed payment, the reservations are released and
    /// the receipt carries no transaction ID. The cart is cleared only after
    /// a successful charge.
    #[tracing::instrument(skip(self, shipping_address, billing_address, metadata))]
    pub async fn place_order(
        &self,
        cart_id: CartId,
        shipping_address: Address,
        billing_address: Address,
        method: PaymentMethod,
        metadata: Metadata,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        metrics::counter!("checkout_attempts").increment(1);
        let started = std::time::Instant::now();

        let mut cart = self
            .carts
            .find(cart_id)
            .await?
            .ok_or(CheckoutError::CartNotFound(cart_id))?;
        let user_id = cart.user_id().ok_or(CheckoutError::AnonymousCart)?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let mut products = self
            .load_products(cart.items().iter().map(|item| item.product_id).collect())
            .await?;

        // Snapshot the cart lines before touching any stock.
        let mut order_items = Vec::with_capacity(cart.items().len());
        for item in cart.items() {
            let product = products
                .get(&item.product_id)
                .ok_or(CheckoutError::ProductNotFound(item.product_id))?;
            let sku = match resolve_variant(product, item.variant_id)? {
                Some(variant_id) => sku_of(product, variant_id)?,
                // Products without variants carry no stock; the slug stands
                // in for a SKU on the order line.
                None => product.slug().as_str().to_string(),
            };
            order_items.push(OrderItem {
                product_id: item.product_id,
                variant_id: item.variant_id,
                product_name: item.product_name.clone(),
                sku,
                unit_price: item.unit_price,
                quantity: item.quantity,
            });
        }

        // Nothing is persisted yet, so a failed reservation aborts cleanly.
        let reserved = reserve_lines(
            &mut products,
            cart.items()
                .iter()
                .map(|item| (item.product_id, item.variant_id, item.quantity)),
        )?;

        let subtotal = cart.subtotal();
        let quote = self.shipping.quote(&shipping_address, subtotal).await?;
        let tax = subtotal.basis_points(self.tax_basis_points);

        let mut order = Order::place(
            user_id,
            Some(cart_id),
            order_items,
            shipping_address,
            billing_address,
            quote.method,
            quote.cost,
            tax,
            metadata,
        )?;

        if let Err(err) = self.persist_products(&mut products).await {
            self.release_reserved(&mut products, &reserved).await;
            return Err(err);
        }
        if let Err(err) = self.orders.save(&mut order).await {
            self.release_reserved(&mut products, &reserved).await;
            return Err(err.into());
        }
        metrics::counter!("checkout_orders_placed").increment(1);

        let total = order.total();
        match self.gateway.charge(order.id(), user_id, total, method).await {
            Ok(charge) => {
                order.mark_paid(charge.transaction_id.clone(), method)?;
                self.orders.save(&mut order).await?;

                cart.clear();
                self.carts.save(&mut cart).await?;

                metrics::counter!("checkout_payments_captured").increment(1);
                metrics::histogram!("checkout_duration_seconds")
                    .record(started.elapsed().as_secs_f64());
                tracing::info!(order_id = %order.id(), %total, "order placed and paid");

                Ok(CheckoutReceipt {
                    order_id: order.id(),
                    total,
                    transaction_id: Some(charge.transaction_id),
                })
            }
            Err(err) => {
                tracing::warn!(order_id = %order.id(), error = %err, "charge declined");
                order.record_payment_failure(err.to_string())?;
                self.orders.save(&mut order).await?;
                self.release_reserved(&mut products, &reserved).await;

                metrics::counter!("checkout_payments_declined").increment(1);
                metrics::histogram!("checkout_duration_seconds")
                    .record(started.elapsed().as_secs_f64());

                Ok(CheckoutReceipt {
                    order_id: order.id(),
                    total,
                    transaction_id: None,
                })
            }
        }
    }

    /// Retries payment for an order whose previous charge was declined.
    ///
    /// The declined attempt released its reservations, so stock is reserved
    /// again before charging. Returns the gateway transaction ID.
    #[tracing::instrument(skip(self))]
    pub async fn pay_order(
        &self,
        order_id: OrderId,
        method: PaymentMethod,
    ) -> Result<String, CheckoutError> {
        let mut order = self
            .orders
            .find(order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound(order_id))?;

        if !order.payment_status().can_mark_paid() {
            return Err(CheckoutError::OrderNotReady(
                "order is already paid".to_string(),
            ));
        }
        if !order.status().can_process() {
            return Err(CheckoutError::OrderNotReady(format!(
                "order is in {} status",
                order.status()
            )));
        }

        let mut products = self
            .load_products(order.items().iter().map(|item| item.product_id).collect())
            .await?;
        let reserved = reserve_lines(
            &mut products,
            order
                .items()
                .iter()
                .map(|item| (item.product_id, item.variant_id, item.quantity)),
        )?;
        if let Err(err) = self.persist_products(&mut products).await {
            self.release_reserved(&mut products, &reserved).await;
            return Err(err);
        }

        let total = order.total();
        let user_id = order.user_id();
        match self.gateway.charge(order_id, user_id, total, method).await {
            Ok(charge) => {
                order.mark_paid(charge.transaction_id.clone(), method)?;
                self.orders.save(&mut order).await?;

                metrics::counter!("checkout_payments_captured").increment(1);
                tracing::info!(%order_id, "payment captured on retry");
                Ok(charge.transaction_id)
            }
            Err(err) => {
                order.record_payment_failure(err.to_string())?;
                self.orders.save(&mut order).await?;
                self.release_reserved(&mut products, &reserved).await;

                metrics::counter!("checkout_payments_declined").increment(1);
                Err(err)
            }
        }
    }

    /// Cancels an order and unwinds whatever checkout had done for it.
    ///
    /// A captured payment is refunded in full, a booked shipment is
    /// cancelled, and stock goes back: reservations are released for orders
    /// cancelled before shipping, committed stock is returned to the shelf
    /// for orders cancelled in transit. Delivered orders cannot be cancelled.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: OrderId, reason: String) -> Result<(), CheckoutError> {
        let mut order = self
            .orders
            .find(order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound(order_id))?;

        let prior_status = order.status();
        let refund = order
            .payment()
            .filter(|_| order.payment_status().can_refund())
            .map(|record| (record.transaction_id.clone(), order.remaining_refundable()));

        order.cancel(reason)?;

        if let Some((transaction_id, amount)) = refund {
            self.gateway.refund(&transaction_id, amount).await?;
            order.refund(amount, "order cancelled")?;
        }

        if prior_status == OrderStatus::Shipped {
            if let Some(tracking_number) = order.tracking_number() {
                if let Err(err) = self.shipping.cancel_shipment(tracking_number).await {
                    tracing::warn!(%order_id, error = %err, "failed to cancel shipment for cancelled order");
                }
            }
        }

        let mut products = self
            .load_products_for_restock(order.items().iter().map(|item| item.product_id).collect())
            .await?;
        match prior_status {
            // Reservations are held from payment until shipment.
            OrderStatus::Processing => {
                for item in order.items() {
                    let Some(product) = products.get_mut(&item.product_id) else {
                        continue;
                    };
                    let Ok(Some(variant_id)) = resolve_variant(product, item.variant_id) else {
                        continue;
                    };
                    if let Err(err) = product.release_stock(variant_id, item.quantity) {
                        tracing::error!(%order_id, error = %err, "failed to release stock for cancelled order");
                    }
                }
            }
            // Shipped stock was already committed; put it back on the shelf.
            OrderStatus::Shipped => {
                for item in order.items() {
                    let Some(product) = products.get_mut(&item.product_id) else {
                        continue;
                    };
                    let Ok(Some(variant_id)) = resolve_variant(product, item.variant_id) else {
                        continue;
                    };
                    if let Err(err) = product.adjust_stock(variant_id, i64::from(item.quantity)) {
                        tracing::error!(%order_id, error = %err, "failed to restock cancelled order");
                    }
                }
            }
            _ => {}
        }
        self.persist_products(&mut products).await?;
        self.orders.save(&mut order).await?;

        metrics::counter!("checkout_orders_cancelled").increment(1);
        tracing::info!(%order_id, "order cancelled");
        Ok(())
    }

    /// Books a shipment and marks the order shipped.
    ///
    /// The domain enforces that only a paid, processing order can ship; a
    /// rejected shipment is cancelled with the carrier. Shipping commits the
    /// stock reservations taken at payment time. Returns the tracking number.
    #[tracing::instrument(skip(self))]
    pub async fn ship_order(&self, order_id: OrderId) -> Result<String, CheckoutError> {
        let mut order = self
            .orders
            .find(order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound(order_id))?;

        let shipment = self.shipping.create_shipment(order.id()).await?;
        if let Err(err) = order.ship(shipment.tracking_number.clone()) {
            if let Err(cancel_err) = self
                .shipping
                .cancel_shipment(&shipment.tracking_number)
                .await
            {
                tracing::error!(%order_id, error = %cancel_err, "failed to cancel rejected shipment");
            }
            return Err(err.into());
        }

        let mut products = self
            .load_products_for_restock(order.items().iter().map(|item| item.product_id).collect())
            .await?;
        for item in order.items() {
            let Some(product) = products.get_mut(&item.product_id) else {
                continue;
            };
            let Ok(Some(variant_id)) = resolve_variant(product, item.variant_id) else {
                continue;
            };
            if let Err(err) = product.commit_stock(variant_id, item.quantity) {
                tracing::error!(%order_id, error = %err, "failed to commit stock for shipped order");
            }
        }
        self.persist_products(&mut products).await?;
        self.orders.save(&mut order).await?;

        metrics::counter!("checkout_orders_shipped").increment(1);
        tracing::info!(%order_id, tracking_number = %shipment.tracking_number, "order shipped");
        Ok(shipment.tracking_number)
    }

    /// Refunds part or all of a captured payment.
    ///
    /// The domain validates the amount against what is still refundable
    /// before any money moves, so an invalid refund never reaches the
    /// gateway.
    #[tracing::instrument(skip(self, reason))]
    pub async fn refund_order(
        &self,
        order_id: OrderId,
        amount: Money,
        reason: String,
    ) -> Result<(), CheckoutError> {
        let mut order = self
            .orders
            .find(order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound(order_id))?;
        let Some(record) = order.payment() else {
            return Err(CheckoutError::OrderNotReady(
                "order has no captured payment".to_string(),
            ));
        };
        let transaction_id = record.transaction_id.clone();

        order.refund(amount, reason)?;
        self.gateway.refund(&transaction_id, amount).await?;
        self.orders.save(&mut order).await?;

        metrics::counter!("checkout_refunds_issued").increment(1);
        tracing::info!(%order_id, %amount, "refund issued");
        Ok(())
    }

    /// Loads each product once. Errors when a product is missing.
    async fn load_products(
        &self,
        ids: Vec<ProductId>,
    ) -> Result<HashMap<ProductId, Product>, CheckoutError> {
        let mut products = HashMap::new();
        for product_id in ids {
            if products.contains_key(&product_id) {
                continue;
            }
            let product = self
                .products
                .find(product_id)
                .await?
                .ok_or(CheckoutError::ProductNotFound(product_id))?;
            products.insert(product_id, product);
        }
        Ok(products)
    }

    /// Like [`load_products`](Self::load_products) but tolerates products
    /// that have since been deleted; their lines are skipped during stock
    /// restitution.
    async fn load_products_for_restock(
        &self,
        ids: Vec<ProductId>,
    ) -> Result<HashMap<ProductId, Product>, CheckoutError> {
        let mut products = HashMap::new();
        for product_id in ids {
            if products.contains_key(&product_id) {
                continue;
            }
            if let Some(product) = self.products.find(product_id).await? {
                products.insert(product_id, product);
            }
        }
        Ok(products)
    }

    /// Saves every product that recorded events.
    async fn persist_products(
        &self,
        products: &mut HashMap<ProductId, Product>,
    ) -> Result<(), CheckoutError> {
        for product in products.values_mut() {
            if product.pending_events().is_empty() {
                continue;
            }
            self.products.save(product).await?;
        }
        Ok(())
    }

    /// Best-effort compensation. Failures are logged; the caller surfaces
    /// its own error.
    async fn release_reserved(
        &self,
        products: &mut HashMap<ProductId, Product>,
        reserved: &[ReservedLine],
    ) {
        for line in reserved {
            let Some(product) = products.get_mut(&line.product_id) else {
                continue;
            };
            if let Err(err) = product.release_stock(line.variant_id, line.quantity) {
                tracing::error!(product_id = %line.product_id, error = %err, "failed to release reserved stock");
            }
        }
        if let Err(err) = self.persist_products(products).await {
            tracing::error!(error = %err, "failed to persist stock release");
        }
    }
}

/// Resolves the variant a line trades against.
///
/// Lines without an explicit variant fall back to the product's first
/// variant; products with no variants at all are not stock-tracked.
fn resolve_variant(
    product: &Product,
    requested: Option<VariantId>,
) -> Result<Option<VariantId>, CheckoutError> {
    match requested {
        Some(variant_id) => {
            if product.variant(variant_id).is_none() {
                return Err(CatalogError::VariantNotFound { variant_id }.into());
            }
            Ok(Some(variant_id))
        }
        None => Ok(product.variants().first().map(|variant| variant.id())),
    }
}

fn sku_of(product: &Product, variant_id: VariantId) -> Result<String, CheckoutError> {
    let variant = product
        .variant(variant_id)
        .ok_or(CatalogError::VariantNotFound { variant_id })?;
    Ok(variant.sku().as_str().to_string())
}

/// Reserves stock for each stock-tracked line, returning the reservations
/// for later compensation.
fn reserve_lines<I>(
    products: &mut HashMap<ProductId, Product>,
    lines: I,
) -> Result<Vec<ReservedLine>, CheckoutError>
where
    I: IntoIterator<Item = (ProductId, Option<VariantId>, u32)>,
{
    let mut reserved = Vec::new();
    for (product_id, variant_id, quantity) in lines {
        let product = products
            .get_mut(&product_id)
            .ok_or(CheckoutError::ProductNotFound(product_id))?;
        if let Some(variant_id) = resolve_variant(product, variant_id)? {
            product.reserve_stock(variant_id, quantity)?;
            reserved.push(ReservedLine {
                product_id,
                variant_id,
                quantity,
            });
        }
    }
    Ok(reserved)
}
