//! Admin datatable request model.
//!
//! The client-shaped half of admin table querying: paging, sorting, column
//! filters and global search. Translation to SQL lives in the store layer
//! behind the [`AdminTables`] port; this module never touches column names
//! beyond carrying them as opaque strings for the schema whitelist to judge.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// The admin tables the backend exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminTable {
    Products,
    Orders,
    Users,
}

impl AdminTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminTable::Products => "products",
            AdminTable::Orders => "orders",
            AdminTable::Users => "users",
        }
    }
}

impl std::fmt::Display for AdminTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A paged, filtered, sorted request against one admin table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTableRequest {
    /// 1-based page number.
    pub page: u32,
    pub per_page: u32,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub sort: Option<Sort>,
    #[serde(default)]
    pub filters: Vec<Filter>,
}

impl DataTableRequest {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page,
            per_page,
            search: None,
            sort: None,
            filters: Vec::new(),
        }
    }

    /// Floors the page at 1 and clamps `per_page` to the configured maximum.
    pub fn normalized(mut self, max_per_page: u32) -> Self {
        self.page = self.page.max(1);
        self.per_page = self.per_page.clamp(1, max_per_page.max(1));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sort {
    pub column: String,
    #[serde(default)]
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    /// Required for every operator except `IsNull`/`NotNull`.
    #[serde(default)]
    pub value: Option<FilterValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    NotEq,
    Contains,
    StartsWith,
    Gt,
    Gte,
    Lt,
    Lte,
    IsNull,
    NotNull,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::NotEq => "not_eq",
            FilterOp::Contains => "contains",
            FilterOp::StartsWith => "starts_with",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
            FilterOp::IsNull => "is_null",
            FilterOp::NotNull => "not_null",
        }
    }
}

impl std::fmt::Display for FilterOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A filter value as it arrives from the client.
///
/// UUIDs and timestamps are carried as strings on the wire; the untagged
/// representation recognizes them before falling back to plain text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Bool(bool),
    Number(i64),
    Decimal(f64),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Text(String),
}

/// Column value types a table schema can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Text,
    Number,
    Decimal,
    Bool,
    Uuid,
    Timestamp,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Text => "text",
            ColumnKind::Number => "number",
            ColumnKind::Decimal => "decimal",
            ColumnKind::Bool => "bool",
            ColumnKind::Uuid => "uuid",
            ColumnKind::Timestamp => "timestamp",
        }
    }
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataTableError {
    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("operator {op} is not supported on column {column}")]
    UnsupportedOp { op: FilterOp, column: String },

    #[error("filter on {column} expects a {kind} value")]
    InvalidValue { column: String, kind: ColumnKind },

    #[error("filter on {column} requires a value")]
    MissingValue { column: String },

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// A page of rows plus the pagination bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct DataTableResponse {
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
    pub page: u32,
    pub per_page: u32,
    pub total_rows: u64,
    pub total_pages: u32,
}

impl DataTableResponse {
    pub fn assemble(
        rows: Vec<serde_json::Map<String, serde_json::Value>>,
        page: u32,
        per_page: u32,
        total_rows: u64,
    ) -> Self {
        let total_pages = total_rows.div_ceil(u64::from(per_page.max(1))) as u32;
        Self {
            rows,
            page,
            per_page,
            total_rows,
            total_pages,
        }
    }
}

/// Executes datatable requests against one backing store.
///
/// Implementations whitelist column names against their table schemas and
/// reject anything unknown, so a request can never reach past the exposed
/// columns.
#[async_trait]
pub trait AdminTables: Send + Sync {
    async fn execute(
        &self,
        table: AdminTable,
        request: &DataTableRequest,
    ) -> Result<DataTableResponse, DataTableError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_floors_page_and_clamps_per_page() {
        let request = DataTableRequest::new(0, 9999).normalized(100);
        assert_eq!(request.page, 1);
        assert_eq!(request.per_page, 100);

        let request = DataTableRequest::new(3, 0).normalized(100);
        assert_eq!(request.per_page, 1);
    }

    #[test]
    fn test_response_page_arithmetic() {
        let response = DataTableResponse::assemble(Vec::new(), 2, 10, 41);
        assert_eq!(response.total_pages, 5);

        let response = DataTableResponse::assemble(Vec::new(), 1, 10, 0);
        assert_eq!(response.total_pages, 0);
    }

    #[test]
    fn test_request_deserializes_from_client_json() {
        let request: DataTableRequest = serde_json::from_str(
            r#"{
                "page": 2,
                "per_page": 25,
                "search": "anvil",
                "sort": {"column": "name"},
                "filters": [
                    {"column": "status", "op": "eq", "value": "active"},
                    {"column": "total_cents", "op": "gte", "value": 5000},
                    {"column": "user_id", "op": "is_null"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(request.page, 2);
        assert_eq!(request.sort.as_ref().unwrap().column, "name");
        assert!(!request.sort.as_ref().unwrap().descending);
        assert_eq!(request.filters.len(), 3);
        assert_eq!(
            request.filters[0].value,
            Some(FilterValue::Text("active".into()))
        );
        assert_eq!(request.filters[1].value, Some(FilterValue::Number(5000)));
        assert_eq!(request.filters[2].op, FilterOp::IsNull);
        assert_eq!(request.filters[2].value, None);
    }

    #[test]
    fn test_minimal_request_defaults() {
        let request: DataTableRequest =
            serde_json::from_str(r#"{"page": 1, "per_page": 10}"#).unwrap();
        assert!(request.search.is_none());
        assert!(request.sort.is_none());
        assert!(request.filters.is_empty());
    }
}
