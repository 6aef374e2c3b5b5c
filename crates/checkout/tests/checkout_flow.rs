//! End-to-end checkout flows over in-memory repositories and services.

use std::sync::Arc;

use checkout::{CheckoutError, CheckoutService, InMemoryPaymentGateway, InMemoryShippingProvider};
use common::{CartId, Currency, Metadata, Money, UserId, VariantId};
use domain::Address;
use domain::cart::Cart;
use domain::catalog::{Product, ProductStatus, Sku, Slug};
use domain::order::{Order, OrderStatus, PaymentMethod, PaymentStatus};
use domain::repository::{CartRepository, OrderRepository, ProductRepository};
use store::{InMemoryCartRepository, InMemoryOrderRepository, InMemoryProductRepository};

fn usd(cents: i64) -> Money {
    Money::from_cents(cents, Currency::Usd)
}

fn address() -> Address {
    Address::new("1 Main St", None, "Springfield", "IL", "62704", "US").unwrap()
}

struct Harness {
    products: InMemoryProductRepository,
    carts: InMemoryCartRepository,
    orders: InMemoryOrderRepository,
    gateway: InMemoryPaymentGateway,
    shipping: InMemoryShippingProvider,
    service: CheckoutService<InMemoryPaymentGateway, InMemoryShippingProvider>,
}

impl Harness {
    fn new() -> Self {
        let products = InMemoryProductRepository::new();
        let carts = InMemoryCartRepository::new();
        let orders = InMemoryOrderRepository::new();
        let gateway = InMemoryPaymentGateway::new();
        let shipping = InMemoryShippingProvider::new();
        let service = CheckoutService::new(
            Arc::new(products.clone()),
            Arc::new(carts.clone()),
            Arc::new(orders.clone()),
            gateway.clone(),
            shipping.clone(),
            825,
        );
        Self {
            products,
            carts,
            orders,
            gateway,
            shipping,
            service,
        }
    }

    /// Seeds an active product with one stocked variant.
    async fn seed_product(&self, stock: u32) -> Product {
        let mut product = Product::create(
            "Walnut Desk",
            Slug::parse("walnut-desk").unwrap(),
            "Solid walnut standing desk",
            usd(1000),
            None,
            Metadata::new(),
        )
        .unwrap();
        product
            .add_variant(
                Sku::parse("DESK-WAL-01").unwrap(),
                None,
                Vec::new(),
                stock,
                Metadata::new(),
            )
            .unwrap();
        product.set_status(ProductStatus::Active).unwrap();
        self.products.save(&mut product).await.unwrap();
        product
    }

    /// Seeds a user-owned cart holding `quantity` of the product.
    async fn seed_cart(&self, product: &Product, quantity: u32) -> CartId {
        let mut cart = Cart::create(Some(UserId::new()), Currency::Usd, Metadata::new());
        cart.add_item(
            product.id(),
            None,
            product.name(),
            product.base_price(),
            quantity,
        )
        .unwrap();
        self.carts.save(&mut cart).await.unwrap();
        cart.id()
    }

    async fn stock_of(&self, product: &Product) -> (u32, u32, u32) {
        let stored = self.products.find(product.id()).await.unwrap().unwrap();
        let variant = stored.variants().first().unwrap();
        (
            variant.stock().on_hand(),
            variant.stock().reserved(),
            variant.stock().available(),
        )
    }

    fn variant_of(product: &Product) -> VariantId {
        product.variants().first().unwrap().id()
    }

    async fn order(&self, receipt_order_id: common::OrderId) -> Order {
        self.orders.find(receipt_order_id).await.unwrap().unwrap()
    }
}

#[tokio::test]
async fn test_place_order_charges_and_clears_cart() {
    let harness = Harness::new();
    let product = harness.seed_product(10).await;
    let cart_id = harness.seed_cart(&product, 2).await;

    let receipt = harness
        .service
        .place_order(
            cart_id,
            address(),
            address(),
            PaymentMethod::Card,
            Metadata::new(),
        )
        .await
        .unwrap();

    // 2 x 10.00 subtotal, 8.25% tax, 5.00 flat shipping.
    assert_eq!(receipt.total, usd(2665));
    assert_eq!(receipt.transaction_id.as_deref(), Some("PAY-0001"));
    assert_eq!(harness.gateway.charge_count(), 1);
    assert!(harness.gateway.has_charge("PAY-0001"));

    let order = harness.order(receipt.order_id).await;
    assert_eq!(order.status(), OrderStatus::Processing);
    assert_eq!(order.payment_status(), PaymentStatus::Paid);
    assert_eq!(order.items().len(), 1);
    assert_eq!(order.items()[0].sku, "DESK-WAL-01");

    let cart = harness.carts.find(cart_id).await.unwrap().unwrap();
    assert!(cart.is_empty());

    assert_eq!(harness.stock_of(&product).await, (10, 2, 8));
}

#[tokio::test]
async fn test_declined_charge_keeps_order_and_releases_stock() {
    let harness = Harness::new();
    let product = harness.seed_product(5).await;
    let cart_id = harness.seed_cart(&product, 3).await;
    harness.gateway.set_fail_on_charge(true);

    let receipt = harness
        .service
        .place_order(
            cart_id,
            address(),
            address(),
            PaymentMethod::Card,
            Metadata::new(),
        )
        .await
        .unwrap();

    assert!(receipt.transaction_id.is_none());
    assert_eq!(harness.gateway.charge_count(), 0);

    let order = harness.order(receipt.order_id).await;
    assert_eq!(order.status(), OrderStatus::Pending);
    assert_eq!(order.payment_status(), PaymentStatus::Failed);

    // Reservations were released and the cart kept for another attempt.
    assert_eq!(harness.stock_of(&product).await, (5, 0, 5));
    let cart = harness.carts.find(cart_id).await.unwrap().unwrap();
    assert!(!cart.is_empty());
}

#[tokio::test]
async fn test_pay_order_retries_a_declined_charge() {
    let harness = Harness::new();
    let product = harness.seed_product(5).await;
    let cart_id = harness.seed_cart(&product, 1).await;
    harness.gateway.set_fail_on_charge(true);

    let receipt = harness
        .service
        .place_order(
            cart_id,
            address(),
            address(),
            PaymentMethod::Card,
            Metadata::new(),
        )
        .await
        .unwrap();
    assert!(receipt.transaction_id.is_none());

    harness.gateway.set_fail_on_charge(false);
    let transaction_id = harness
        .service
        .pay_order(receipt.order_id, PaymentMethod::Card)
        .await
        .unwrap();
    assert!(harness.gateway.has_charge(&transaction_id));

    let order = harness.order(receipt.order_id).await;
    assert_eq!(order.status(), OrderStatus::Processing);
    assert_eq!(order.payment_status(), PaymentStatus::Paid);
    assert_eq!(harness.stock_of(&product).await, (5, 1, 4));
}

#[tokio::test]
async fn test_pay_order_rejects_an_already_paid_order() {
    let harness = Harness::new();
    let product = harness.seed_product(5).await;
    let cart_id = harness.seed_cart(&product, 1).await;

    let receipt = harness
        .service
        .place_order(
            cart_id,
            address(),
            address(),
            PaymentMethod::Card,
            Metadata::new(),
        )
        .await
        .unwrap();

    let err = harness
        .service
        .pay_order(receipt.order_id, PaymentMethod::Card)
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::OrderNotReady(_)));
}

#[tokio::test]
async fn test_cancel_paid_order_refunds_and_releases_stock() {
    let harness = Harness::new();
    let product = harness.seed_product(8).await;
    let cart_id = harness.seed_cart(&product, 2).await;

    let receipt = harness
        .service
        .place_order(
            cart_id,
            address(),
            address(),
            PaymentMethod::Card,
            Metadata::new(),
        )
        .await
        .unwrap();
    assert_eq!(harness.gateway.charge_count(), 1);

    harness
        .service
        .cancel_order(receipt.order_id, "changed my mind".to_string())
        .await
        .unwrap();

    let order = harness.order(receipt.order_id).await;
    assert_eq!(order.status(), OrderStatus::Cancelled);
    assert_eq!(order.payment_status(), PaymentStatus::Refunded);
    assert_eq!(order.cancel_reason(), Some("changed my mind"));

    // Fully refunded charges are dropped from the gateway.
    assert_eq!(harness.gateway.charge_count(), 0);
    assert_eq!(harness.stock_of(&product).await, (8, 0, 8));
}

#[tokio::test]
async fn test_ship_commits_stock_and_books_a_shipment() {
    let harness = Harness::new();
    let product = harness.seed_product(10).await;
    let cart_id = harness.seed_cart(&product, 4).await;

    let receipt = harness
        .service
        .place_order(
            cart_id,
            address(),
            address(),
            PaymentMethod::Card,
            Metadata::new(),
        )
        .await
        .unwrap();

    let tracking_number = harness.service.ship_order(receipt.order_id).await.unwrap();
    assert_eq!(tracking_number, "TRACK-0001");
    assert!(harness.shipping.has_shipment(&tracking_number));
    assert_eq!(harness.shipping.shipment_count(), 1);

    let mut order = harness.order(receipt.order_id).await;
    assert_eq!(order.status(), OrderStatus::Shipped);
    assert_eq!(order.tracking_number(), Some(tracking_number.as_str()));

    // Shipping commits the reservation: on-hand drops, nothing stays reserved.
    assert_eq!(harness.stock_of(&product).await, (6, 0, 6));

    order.deliver().unwrap();
    harness.orders.save(&mut order).await.unwrap();
    let order = harness.order(receipt.order_id).await;
    assert_eq!(order.status(), OrderStatus::Delivered);
}

#[tokio::test]
async fn test_cancel_shipped_order_restocks_committed_units() {
    let harness = Harness::new();
    let product = harness.seed_product(10).await;
    let cart_id = harness.seed_cart(&product, 4).await;

    let receipt = harness
        .service
        .place_order(
            cart_id,
            address(),
            address(),
            PaymentMethod::Card,
            Metadata::new(),
        )
        .await
        .unwrap();
    let tracking_number = harness.service.ship_order(receipt.order_id).await.unwrap();

    harness
        .service
        .cancel_order(receipt.order_id, "lost in transit".to_string())
        .await
        .unwrap();

    let order = harness.order(receipt.order_id).await;
    assert_eq!(order.status(), OrderStatus::Cancelled);
    assert_eq!(order.payment_status(), PaymentStatus::Refunded);

    // Committed units go back on the shelf and the shipment is cancelled.
    assert_eq!(harness.stock_of(&product).await, (10, 0, 10));
    assert!(!harness.shipping.has_shipment(&tracking_number));
}

#[tokio::test]
async fn test_partial_refund_tracks_remaining_amount() {
    let harness = Harness::new();
    let product = harness.seed_product(5).await;
    let cart_id = harness.seed_cart(&product, 2).await;

    let receipt = harness
        .service
        .place_order(
            cart_id,
            address(),
            address(),
            PaymentMethod::Card,
            Metadata::new(),
        )
        .await
        .unwrap();
    let transaction_id = receipt.transaction_id.unwrap();

    harness
        .service
        .refund_order(receipt.order_id, usd(500), "damaged box".to_string())
        .await
        .unwrap();

    let order = harness.order(receipt.order_id).await;
    assert_eq!(order.payment_status(), PaymentStatus::PartiallyRefunded);
    assert_eq!(order.refunded(), usd(500));
    assert_eq!(
        harness.gateway.remaining_amount(&transaction_id),
        Some(receipt.total.subtract(usd(500)))
    );

    harness
        .service
        .refund_order(
            receipt.order_id,
            order.remaining_refundable(),
            "full goodwill refund".to_string(),
        )
        .await
        .unwrap();

    let order = harness.order(receipt.order_id).await;
    assert_eq!(order.payment_status(), PaymentStatus::Refunded);
    assert_eq!(harness.gateway.charge_count(), 0);
}

#[tokio::test]
async fn test_insufficient_stock_aborts_before_any_side_effect() {
    let harness = Harness::new();
    let product = harness.seed_product(1).await;
    let cart_id = harness.seed_cart(&product, 3).await;

    let err = harness
        .service
        .place_order(
            cart_id,
            address(),
            address(),
            PaymentMethod::Card,
            Metadata::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::Domain(_)));

    assert_eq!(harness.gateway.charge_count(), 0);
    assert_eq!(harness.stock_of(&product).await, (1, 0, 1));
    let cart = harness.carts.find(cart_id).await.unwrap().unwrap();
    assert!(!cart.is_empty());
}

#[tokio::test]
async fn test_empty_and_anonymous_carts_are_rejected() {
    let harness = Harness::new();

    let mut empty = Cart::create(Some(UserId::new()), Currency::Usd, Metadata::new());
    harness.carts.save(&mut empty).await.unwrap();
    let err = harness
        .service
        .place_order(
            empty.id(),
            address(),
            address(),
            PaymentMethod::Card,
            Metadata::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::EmptyCart));

    let product = harness.seed_product(5).await;
    let mut anonymous = Cart::create(None, Currency::Usd, Metadata::new());
    anonymous
        .add_item(
            product.id(),
            Some(Harness::variant_of(&product)),
            product.name(),
            product.base_price(),
            1,
        )
        .unwrap();
    harness.carts.save(&mut anonymous).await.unwrap();
    let err = harness
        .service
        .place_order(
            anonymous.id(),
            address(),
            address(),
            PaymentMethod::Card,
            Metadata::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::AnonymousCart));
}
