//! Query types and their handlers.
//!
//! One handler struct per read port, implementing `QueryHandler` for each
//! query the port can answer. Admin table queries normalize their paging
//! against the configured ceiling before touching the backend.

use std::sync::Arc;

use async_trait::async_trait;
use common::{CartId, OrderId, ProductId, UserId};

use crate::datatable::{AdminTable, AdminTables, DataTableRequest, DataTableResponse};
use crate::error::AppError;
use crate::mediator::{Query, QueryHandler};
use crate::read::{
    CartDetail, CartReader, CatalogReader, CategorySummary, OrderDetail, OrderReader,
    OrderSummary, ProductDetail, UserDetail, UserReader,
};

pub struct GetProduct {
    pub product_id: ProductId,
}

impl Query for GetProduct {
    type Output = Option<ProductDetail>;
}

pub struct GetProductBySlug {
    pub slug: String,
}

impl Query for GetProductBySlug {
    type Output = Option<ProductDetail>;
}

pub struct ListCategories;

impl Query for ListCategories {
    type Output = Vec<CategorySummary>;
}

/// Answers the catalog queries through a [`CatalogReader`].
#[derive(Clone)]
pub struct CatalogQueries {
    reader: Arc<dyn CatalogReader>,
}

impl CatalogQueries {
    pub fn new(reader: Arc<dyn CatalogReader>) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl QueryHandler<GetProduct> for CatalogQueries {
    async fn handle(&self, query: GetProduct) -> Result<Option<ProductDetail>, AppError> {
        Ok(self.reader.product_detail(query.product_id).await?)
    }
}

#[async_trait]
impl QueryHandler<GetProductBySlug> for CatalogQueries {
    async fn handle(&self, query: GetProductBySlug) -> Result<Option<ProductDetail>, AppError> {
        Ok(self.reader.product_by_slug(&query.slug).await?)
    }
}

#[async_trait]
impl QueryHandler<ListCategories> for CatalogQueries {
    async fn handle(&self, _query: ListCategories) -> Result<Vec<CategorySummary>, AppError> {
        Ok(self.reader.list_categories().await?)
    }
}

pub struct GetCart {
    pub cart_id: CartId,
}

impl Query for GetCart {
    type Output = Option<CartDetail>;
}

#[derive(Clone)]
pub struct CartQueries {
    reader: Arc<dyn CartReader>,
}

impl CartQueries {
    pub fn new(reader: Arc<dyn CartReader>) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl QueryHandler<GetCart> for CartQueries {
    async fn handle(&self, query: GetCart) -> Result<Option<CartDetail>, AppError> {
        Ok(self.reader.cart_detail(query.cart_id).await?)
    }
}

pub struct GetOrder {
    pub order_id: OrderId,
}

impl Query for GetOrder {
    type Output = Option<OrderDetail>;
}

pub struct ListUserOrders {
    pub user_id: UserId,
}

impl Query for ListUserOrders {
    type Output = Vec<OrderSummary>;
}

#[derive(Clone)]
pub struct OrderQueries {
    reader: Arc<dyn OrderReader>,
}

impl OrderQueries {
    pub fn new(reader: Arc<dyn OrderReader>) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl QueryHandler<GetOrder> for OrderQueries {
    async fn handle(&self, query: GetOrder) -> Result<Option<OrderDetail>, AppError> {
        Ok(self.reader.order_detail(query.order_id).await?)
    }
}

#[async_trait]
impl QueryHandler<ListUserOrders> for OrderQueries {
    async fn handle(&self, query: ListUserOrders) -> Result<Vec<OrderSummary>, AppError> {
        Ok(self.reader.orders_for_user(query.user_id).await?)
    }
}

pub struct GetUser {
    pub user_id: UserId,
}

impl Query for GetUser {
    type Output = Option<UserDetail>;
}

pub struct GetUserByEmail {
    pub email: String,
}

impl Query for GetUserByEmail {
    type Output = Option<UserDetail>;
}

#[derive(Clone)]
pub struct UserQueries {
    reader: Arc<dyn UserReader>,
}

impl UserQueries {
    pub fn new(reader: Arc<dyn UserReader>) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl QueryHandler<GetUser> for UserQueries {
    async fn handle(&self, query: GetUser) -> Result<Option<UserDetail>, AppError> {
        Ok(self.reader.user_detail(query.user_id).await?)
    }
}

#[async_trait]
impl QueryHandler<GetUserByEmail> for UserQueries {
    async fn handle(&self, query: GetUserByEmail) -> Result<Option<UserDetail>, AppError> {
        Ok(self.reader.user_by_email(&query.email).await?)
    }
}

pub struct ProductsTable {
    pub request: DataTableRequest,
}

impl Query for ProductsTable {
    type Output = DataTableResponse;
}

pub struct OrdersTable {
    pub request: DataTableRequest,
}

impl Query for OrdersTable {
    type Output = DataTableResponse;
}

pub struct UsersTable {
    pub request: DataTableRequest,
}

impl Query for UsersTable {
    type Output = DataTableResponse;
}

/// Answers the admin table queries, clamping paging to the configured
/// ceiling first.
#[derive(Clone)]
pub struct TableQueries {
    tables: Arc<dyn AdminTables>,
    max_per_page: u32,
}

impl TableQueries {
    pub fn new(tables: Arc<dyn AdminTables>, max_per_page: u32) -> Self {
        Self {
            tables,
            max_per_page,
        }
    }

    async fn run(
        &self,
        table: AdminTable,
        request: DataTableRequest,
    ) -> Result<DataTableResponse, AppError> {
        let request = request.normalized(self.max_per_page);
        Ok(self.tables.execute(table, &request).await?)
    }
}

#[async_trait]
impl QueryHandler<ProductsTable> for TableQueries {
    async fn handle(&self, query: ProductsTable) -> Result<DataTableResponse, AppError> {
        self.run(AdminTable::Products, query.request).await
    }
}

#[async_trait]
impl QueryHandler<OrdersTable> for TableQueries {
    async fn handle(&self, query: OrdersTable) -> Result<DataTableResponse, AppError> {
        self.run(AdminTable::Orders, query.request).await
    }
}

#[async_trait]
impl QueryHandler<UsersTable> for TableQueries {
    async fn handle(&self, query: UsersTable) -> Result<DataTableResponse, AppError> {
        self.run(AdminTable::Users, query.request).await
    }
}
