//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container and are ignored by default
//! because they need a running Docker daemon. Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --ignored
//! ```

use std::sync::Arc;

use app::datatable::{AdminTable, AdminTables, DataTableRequest, Filter, FilterOp, FilterValue};
use app::read::{CartReader, CatalogReader, OrderReader, UserReader};
use common::{Currency, Metadata, Money, UserId, Version};
use domain::AggregateRoot;
use domain::cart::Cart;
use domain::catalog::{Product, ProductStatus, Sku, Slug};
use domain::identity::{Email, PasswordHash, User};
use domain::order::{Order, OrderItem, PaymentMethod};
use domain::repository::{
    CartRepository, OrderRepository, ProductRepository, UserRepository,
};
use domain::{Address, RepositoryError};
use outbox::{OutboxStore, PostgresOutboxStore};
use serial_test::serial;
use sqlx::PgPool;
use store::{
    PostgresCartRepository, PostgresOrderRepository, PostgresProductRepository, PostgresReaders,
    PostgresTables, PostgresUserRepository, run_migrations,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

#[ctor::ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Migrate once with a temporary pool
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            run_migrations(&temp_pool).await.unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh pool with every table cleared
async fn get_test_pool() -> PgPool {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query(
        "TRUNCATE TABLE products, categories, attributes, carts, orders, users, outbox_messages",
    )
    .execute(&pool)
    .await
    .unwrap();

    pool
}

fn usd(cents: i64) -> Money {
    Money::from_cents(cents, Currency::Usd)
}

fn address() -> Address {
    Address::new("1 Main St", None, "Springfield", "IL", "62704", "US").unwrap()
}

fn make_product(slug: &str, sku: &str, stock: u32) -> Product {
    let mut product = Product::create(
        "Walnut Desk",
        Slug::parse(slug).unwrap(),
        "Solid walnut standing desk",
        usd(1000),
        None,
        Metadata::new(),
    )
    .unwrap();
    product
        .add_variant(
            Sku::parse(sku).unwrap(),
            None,
            Vec::new(),
            stock,
            Metadata::new(),
        )
        .unwrap();
    product.set_status(ProductStatus::Active).unwrap();
    product
}

fn make_user(email: &str) -> User {
    User::register(
        Email::parse(email).unwrap(),
        PasswordHash::parse("argon2id$stub").unwrap(),
        "Ada",
        "Lovelace",
    )
    .unwrap()
}

fn make_order(user_id: UserId, product: &Product) -> Order {
    let variant = product.variants().first().unwrap();
    Order::place(
        user_id,
        None,
        vec![OrderItem {
            product_id: product.id(),
            variant_id: Some(variant.id()),
            product_name: product.name().to_string(),
            sku: variant.sku().as_str().to_string(),
            unit_price: product.base_price(),
            quantity: 2,
        }],
        address(),
        address(),
        "standard".to_string(),
        usd(500),
        usd(165),
        Metadata::new(),
    )
    .unwrap()
}

#[tokio::test]
#[serial]
#[ignore = "requires a running Docker daemon"]
async fn product_roundtrips_through_its_document() {
    let pool = get_test_pool().await;
    let repo = PostgresProductRepository::new(pool);

    let mut product = make_product("walnut-desk", "DESK-WAL-01", 10);
    let product_id = product.id();
    repo.save(&mut product).await.unwrap();
    assert_eq!(product.version(), Version::new(1));

    let stored = repo.find(product_id).await.unwrap().unwrap();
    assert_eq!(stored.id(), product_id);
    assert_eq!(stored.status(), ProductStatus::Active);
    assert_eq!(stored.version(), Version::new(1));
    assert_eq!(stored.variants().len(), 1);
    assert_eq!(stored.variants()[0].stock().available(), 10);

    let by_slug = repo
        .find_by_slug(&Slug::parse("walnut-desk").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_slug.id(), product_id);
    assert!(repo
        .slug_exists(&Slug::parse("walnut-desk").unwrap())
        .await
        .unwrap());

    repo.delete(product_id).await.unwrap();
    assert!(repo.find(product_id).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
#[ignore = "requires a running Docker daemon"]
async fn duplicate_slug_is_rejected() {
    let pool = get_test_pool().await;
    let repo = PostgresProductRepository::new(pool);

    let mut first = make_product("walnut-desk", "DESK-WAL-01", 5);
    repo.save(&mut first).await.unwrap();

    let mut second = make_product("walnut-desk", "DESK-WAL-02", 5);
    let err = repo.save(&mut second).await.unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::Duplicate { field: "slug", .. }
    ));
}

#[tokio::test]
#[serial]
#[ignore = "requires a running Docker daemon"]
async fn stale_save_reports_a_version_conflict() {
    let pool = get_test_pool().await;
    let repo = PostgresProductRepository::new(pool);

    let mut product = make_product("walnut-desk", "DESK-WAL-01", 10);
    let product_id = product.id();
    repo.save(&mut product).await.unwrap();

    let mut fresh = repo.find(product_id).await.unwrap().unwrap();
    let mut stale = repo.find(product_id).await.unwrap().unwrap();

    fresh.reserve_stock(fresh.variants()[0].id(), 1).unwrap();
    repo.save(&mut fresh).await.unwrap();

    stale.reserve_stock(stale.variants()[0].id(), 1).unwrap();
    let err = repo.save(&mut stale).await.unwrap_err();
    match err {
        RepositoryError::Conflict {
            expected, actual, ..
        } => {
            assert_eq!(expected, Version::new(1));
            assert_eq!(actual, Version::new(2));
        }
        other => panic!("expected version conflict, got {other}"),
    }
}

#[tokio::test]
#[serial]
#[ignore = "requires a running Docker daemon"]
async fn save_stages_domain_events_on_the_outbox() {
    let pool = get_test_pool().await;
    let repo = PostgresProductRepository::new(pool.clone());
    let outbox = PostgresOutboxStore::new(pool);

    let mut product = make_product("walnut-desk", "DESK-WAL-01", 10);
    repo.save(&mut product).await.unwrap();

    // Created, variant added, status changed.
    assert_eq!(outbox.pending_count().await.unwrap(), 3);
    let pending = outbox.fetch_pending(10, 5).await.unwrap();
    assert!(pending.iter().all(|m| m.aggregate_type == "product"));
    assert!(pending
        .iter()
        .all(|m| m.aggregate_id == product.id().as_uuid()));
    let mut event_types: Vec<&str> = pending.iter().map(|m| m.event_type.as_str()).collect();
    event_types.sort_unstable();
    assert_eq!(
        event_types,
        ["ProductCreated", "ProductStatusChanged", "VariantAdded"]
    );

    // A clean reload drains nothing further.
    let mut stored = repo.find(product.id()).await.unwrap().unwrap();
    repo.save(&mut stored).await.unwrap();
    assert_eq!(outbox.pending_count().await.unwrap(), 3);
}

#[tokio::test]
#[serial]
#[ignore = "requires a running Docker daemon"]
async fn duplicate_email_is_rejected() {
    let pool = get_test_pool().await;
    let repo = PostgresUserRepository::new(pool);

    let mut first = make_user("ada@example.com");
    repo.save(&mut first).await.unwrap();
    assert!(repo
        .email_exists(&Email::parse("ada@example.com").unwrap())
        .await
        .unwrap());

    let mut second = make_user("ada@example.com");
    let err = repo.save(&mut second).await.unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::Duplicate { field: "email", .. }
    ));

    let found = repo
        .find_by_email(&Email::parse("ada@example.com").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id(), first.id());
}

#[tokio::test]
#[serial]
#[ignore = "requires a running Docker daemon"]
async fn cart_find_for_user_returns_the_freshest_cart() {
    let pool = get_test_pool().await;
    let repo = PostgresCartRepository::new(pool);
    let user_id = UserId::new();

    let mut old = Cart::create(Some(user_id), Currency::Usd, Metadata::new());
    repo.save(&mut old).await.unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    let mut new = Cart::create(Some(user_id), Currency::Usd, Metadata::new());
    repo.save(&mut new).await.unwrap();

    let found = repo.find_for_user(user_id).await.unwrap().unwrap();
    assert_eq!(found.id(), new.id());

    repo.delete(new.id()).await.unwrap();
    let found = repo.find_for_user(user_id).await.unwrap().unwrap();
    assert_eq!(found.id(), old.id());
}

#[tokio::test]
#[serial]
#[ignore = "requires a running Docker daemon"]
async fn readers_serve_details_and_order_history() {
    let pool = get_test_pool().await;
    let products = PostgresProductRepository::new(pool.clone());
    let orders = PostgresOrderRepository::new(pool.clone());
    let users = PostgresUserRepository::new(pool.clone());
    let readers = PostgresReaders::new(pool);

    let mut product = make_product("walnut-desk", "DESK-WAL-01", 10);
    products.save(&mut product).await.unwrap();
    let mut user = make_user("ada@example.com");
    users.save(&mut user).await.unwrap();

    let mut first = make_order(user.id(), &product);
    orders.save(&mut first).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    let mut second = make_order(user.id(), &product);
    second
        .mark_paid("PAY-0001".to_string(), PaymentMethod::Card)
        .unwrap();
    orders.save(&mut second).await.unwrap();

    let detail = readers
        .product_by_slug("walnut-desk")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(detail.id, product.id());
    assert_eq!(detail.variants[0].sku, "DESK-WAL-01");

    let order = readers.order_detail(first.id()).await.unwrap().unwrap();
    assert_eq!(order.lines.len(), 1);
    assert_eq!(order.total, usd(2665));

    // Newest order first.
    let history = readers.orders_for_user(user.id()).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, second.id());
    assert_eq!(history[1].id, first.id());

    let account = readers
        .user_by_email("ada@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(account.id, user.id());
    assert!(readers.user_by_email("not an email").await.unwrap().is_none());
    assert!(readers.cart_detail(common::CartId::new()).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
#[ignore = "requires a running Docker daemon"]
async fn admin_tables_search_filter_and_page() {
    let pool = get_test_pool().await;
    let products = PostgresProductRepository::new(pool.clone());
    let tables = PostgresTables::new(pool);

    for (slug, sku, name) in [
        ("walnut-desk", "DESK-WAL-01", "Walnut Desk"),
        ("oak-desk", "DESK-OAK-01", "Oak Desk"),
        ("brass-anvil", "ANVIL-BRS-01", "Brass Anvil"),
    ] {
        let mut product = Product::create(
            name,
            Slug::parse(slug).unwrap(),
            "",
            usd(1000),
            Some(Sku::parse(sku).unwrap()),
            Metadata::new(),
        )
        .unwrap();
        products.save(&mut product).await.unwrap();
    }

    let mut request = DataTableRequest::new(1, 10);
    request.search = Some("desk".to_string());
    let page = tables
        .execute(AdminTable::Products, &request)
        .await
        .unwrap();
    assert_eq!(page.total_rows, 2);
    assert!(page.rows.iter().all(|row| {
        row.get("name")
            .and_then(|name| name.as_str())
            .is_some_and(|name| name.contains("Desk"))
    }));

    let mut request = DataTableRequest::new(1, 10);
    request.filters = vec![Filter {
        column: "status".to_string(),
        op: FilterOp::Eq,
        value: Some(FilterValue::Text("draft".to_string())),
    }];
    let page = tables
        .execute(AdminTable::Products, &request)
        .await
        .unwrap();
    assert_eq!(page.total_rows, 3);

    let page = tables
        .execute(AdminTable::Products, &DataTableRequest::new(2, 2))
        .await
        .unwrap();
    assert_eq!(page.rows.len(), 1);
    assert_eq!(page.total_rows, 3);
    assert_eq!(page.total_pages, 2);
}
