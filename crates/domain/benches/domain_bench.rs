use criterion::{Criterion, black_box, criterion_group, criterion_main};

use common::{Currency, Metadata, Money, ProductId, UserId};
use domain::Address;
use domain::cart::Cart;
use domain::order::{Order, OrderItem, PaymentMethod};

fn usd(cents: i64) -> Money {
    Money::from_cents(cents, Currency::Usd)
}

fn address() -> Address {
    Address::new("100 Main St", None, "Springfield", "IL", "62704", "US")
        .expect("valid address")
}

fn cart_subtotal(c: &mut Criterion) {
    let mut cart = Cart::create(None, Currency::Usd, Metadata::new());
    for i in 0..50u32 {
        cart.add_item(
            ProductId::new(),
            None,
            format!("Product {i}"),
            usd(100 + i64::from(i)),
            (i % 5) + 1,
        )
        .expect("valid line");
    }
    cart.take_events();

    c.bench_function("cart_subtotal_50_lines", |b| {
        b.iter(|| black_box(&cart).subtotal())
    });
}

fn order_lifecycle(c: &mut Criterion) {
    let items: Vec<OrderItem> = (0..10)
        .map(|i| OrderItem {
            product_id: ProductId::new(),
            variant_id: None,
            product_name: format!("Product {i}"),
            sku: format!("SKU-{i:03}"),
            unit_price: usd(1000),
            quantity: 2,
        })
        .collect();

    c.bench_function("order_place_to_delivered", |b| {
        b.iter(|| {
            let mut order = Order::place(
                UserId::new(),
                None,
                black_box(items.clone()),
                address(),
                address(),
                "standard",
                usd(500),
                usd(300),
                Metadata::new(),
            )
            .expect("valid order");
            order.mark_paid("PAY-0001", PaymentMethod::Card).expect("paid");
            order.ship("TRACK-123").expect("shipped");
            order.deliver().expect("delivered");
            order
        })
    });
}

criterion_group!(benches, cart_subtotal, order_lifecycle);
criterion_main!(benches);
