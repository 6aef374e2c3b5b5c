//! Order commands.
//!
//! Everything that moves money or stock delegates to the checkout service,
//! which sequences gateway, carrier and inventory side effects around the
//! order aggregate. `DeliverOrder` is pure state and talks to the
//! repository directly.

use std::sync::Arc;

use async_trait::async_trait;
use checkout::{CheckoutReceipt, CheckoutService, PaymentGateway, ShippingProvider};
use common::{CartId, Metadata, Money, OrderId};
use domain::Address;
use domain::order::PaymentMethod;
use domain::repository::OrderRepository;

use crate::error::AppError;
use crate::mediator::{Command, CommandHandler};

/// Converts a cart into a paid order.
pub struct PlaceOrder {
    pub cart_id: CartId,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub method: PaymentMethod,
    pub metadata: Metadata,
}

impl Command for PlaceOrder {
    type Output = CheckoutReceipt;
}

pub struct PlaceOrderHandler<G, S>
where
    G: PaymentGateway,
    S: ShippingProvider,
{
    checkout: Arc<CheckoutService<G, S>>,
}

impl<G, S> PlaceOrderHandler<G, S>
where
    G: PaymentGateway,
    S: ShippingProvider,
{
    pub fn new(checkout: Arc<CheckoutService<G, S>>) -> Self {
        Self { checkout }
    }
}

#[async_trait]
impl<G, S> CommandHandler<PlaceOrder> for PlaceOrderHandler<G, S>
where
    G: PaymentGateway + 'static,
    S: ShippingProvider + 'static,
{
    async fn handle(&self, command: PlaceOrder) -> Result<CheckoutReceipt, AppError> {
        let receipt = self
            .checkout
            .place_order(
                command.cart_id,
                command.shipping_address,
                command.billing_address,
                command.method,
                command.metadata,
            )
            .await?;
        Ok(receipt)
    }
}

/// Retries payment on an order whose charge was declined.
pub struct MarkOrderPaid {
    pub order_id: OrderId,
    pub method: PaymentMethod,
}

impl Command for MarkOrderPaid {
    /// The gateway transaction ID.
    type Output = String;
}

pub struct MarkOrderPaidHandler<G, S>
where
    G: PaymentGateway,
    S: ShippingProvider,
{
    checkout: Arc<CheckoutService<G, S>>,
}

impl<G, S> MarkOrderPaidHandler<G, S>
where
    G: PaymentGateway,
    S: ShippingProvider,
{
    pub fn new(checkout: Arc<CheckoutService<G, S>>) -> Self {
        Self { checkout }
    }
}

#[async_trait]
impl<G, S> CommandHandler<MarkOrderPaid> for MarkOrderPaidHandler<G, S>
where
    G: PaymentGateway + 'static,
    S: ShippingProvider + 'static,
{
    async fn handle(&self, command: MarkOrderPaid) -> Result<String, AppError> {
        Ok(self
            .checkout
            .pay_order(command.order_id, command.method)
            .await?)
    }
}

/// Books a shipment, commits the reserved stock and marks the order shipped.
pub struct ShipOrder {
    pub order_id: OrderId,
}

impl Command for ShipOrder {
    /// The carrier tracking number.
    type Output = String;
}

pub struct ShipOrderHandler<G, S>
where
    G: PaymentGateway,
    S: ShippingProvider,
{
    checkout: Arc<CheckoutService<G, S>>,
}

impl<G, S> ShipOrderHandler<G, S>
where
    G: PaymentGateway,
    S: ShippingProvider,
{
    pub fn new(checkout: Arc<CheckoutService<G, S>>) -> Self {
        Self { checkout }
    }
}

#[async_trait]
impl<G, S> CommandHandler<ShipOrder> for ShipOrderHandler<G, S>
where
    G: PaymentGateway + 'static,
    S: ShippingProvider + 'static,
{
    async fn handle(&self, command: ShipOrder) -> Result<String, AppError> {
        Ok(self.checkout.ship_order(command.order_id).await?)
    }
}

pub struct DeliverOrder {
    pub order_id: OrderId,
}

impl Command for DeliverOrder {
    type Output = ();
}

pub struct DeliverOrderHandler {
    orders: Arc<dyn OrderRepository>,
}

impl DeliverOrderHandler {
    pub fn new(orders: Arc<dyn OrderRepository>) -> Self {
        Self { orders }
    }
}

#[async_trait]
impl CommandHandler<DeliverOrder> for DeliverOrderHandler {
    #[tracing::instrument(skip(self, command), fields(order_id = %command.order_id))]
    async fn handle(&self, command: DeliverOrder) -> Result<(), AppError> {
        let mut order = self
            .orders
            .find(command.order_id)
            .await?
            .ok_or_else(|| AppError::not_found("order", command.order_id))?;
        order.deliver()?;
        self.orders.save(&mut order).await?;
        Ok(())
    }
}

/// Cancels an order, refunding any captured payment and returning stock.
pub struct CancelOrder {
    pub order_id: OrderId,
    pub reason: String,
}

impl Command for CancelOrder {
    type Output = ();
}

pub struct CancelOrderHandler<G, S>
where
    G: PaymentGateway,
    S: ShippingProvider,
{
    checkout: Arc<CheckoutService<G, S>>,
}

impl<G, S> CancelOrderHandler<G, S>
where
    G: PaymentGateway,
    S: ShippingProvider,
{
    pub fn new(checkout: Arc<CheckoutService<G, S>>) -> Self {
        Self { checkout }
    }
}

#[async_trait]
impl<G, S> CommandHandler<CancelOrder> for CancelOrderHandler<G, S>
where
    G: PaymentGateway + 'static,
    S: ShippingProvider + 'static,
{
    async fn handle(&self, command: CancelOrder) -> Result<(), AppError> {
        Ok(self
            .checkout
            .cancel_order(command.order_id, command.reason)
            .await?)
    }
}

/// Refunds part or all of a captured payment.
pub struct RefundOrder {
    pub order_id: OrderId,
    pub amount: Money,
    pub reason: String,
}

impl Command for RefundOrder {
    type Output = ();
}

pub struct RefundOrderHandler<G, S>
where
    G: PaymentGateway,
    S: ShippingProvider,
{
    checkout: Arc<CheckoutService<G, S>>,
}

impl<G, S> RefundOrderHandler<G, S>
where
    G: PaymentGateway,
    S: ShippingProvider,
{
    pub fn new(checkout: Arc<CheckoutService<G, S>>) -> Self {
        Self { checkout }
    }
}

#[async_trait]
impl<G, S> CommandHandler<RefundOrder> for RefundOrderHandler<G, S>
where
    G: PaymentGateway + 'static,
    S: ShippingProvider + 'static,
{
    async fn handle(&self, command: RefundOrder) -> Result<(), AppError> {
        Ok(self
            .checkout
            .refund_order(command.order_id, command.amount, command.reason)
            .await?)
    }
}
