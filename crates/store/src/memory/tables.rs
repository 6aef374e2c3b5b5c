//! In-memory datatable backend.
//!
//! Rows are plain JSON objects keyed by table name, evaluated with the same
//! resolved-query semantics the Postgres backend compiles to SQL. Used by
//! handler tests that exercise admin queries without a database.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use app::datatable::{
    AdminTable, AdminTables, ColumnKind, DataTableError, DataTableRequest, DataTableResponse,
    FilterValue,
};

use crate::datatable::{Column, ResolvedFilter, TableSchema, resolve};

#[derive(Clone, Default)]
pub struct InMemoryTables {
    rows: Arc<RwLock<HashMap<String, Vec<Map<String, Value>>>>>,
}

impl InMemoryTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_row(&self, table: &str, row: Map<String, Value>) {
        self.rows
            .write()
            .await
            .entry(table.to_string())
            .or_default()
            .push(row);
    }
}

#[async_trait]
impl AdminTables for InMemoryTables {
    async fn execute(
        &self,
        table: AdminTable,
        request: &DataTableRequest,
    ) -> Result<DataTableResponse, DataTableError> {
        let schema = TableSchema::for_table(table);
        let resolved = resolve(&schema, request)?;

        let rows = self.rows.read().await;
        let mut matched: Vec<Map<String, Value>> = rows
            .get(resolved.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| row_matches(&resolved.filters, row))
                    .filter(|row| {
                        resolved
                            .search
                            .as_deref()
                            .is_none_or(|term| search_matches(&resolved.search_columns, row, term))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        drop(rows);

        let (sort_column, descending) = resolved.sort;
        matched.sort_by(|left, right| {
            let ordering = cell_ordering(sort_column, left, right);
            let ordering = if descending {
                ordering.reverse()
            } else {
                ordering
            };
            ordering.then_with(|| {
                let left_id = left.get("id").and_then(Value::as_str);
                let right_id = right.get("id").and_then(Value::as_str);
                left_id.cmp(&right_id)
            })
        });

        let total_rows = matched.len() as u64;
        let start = (resolved.page - 1) as usize * resolved.per_page as usize;
        let page: Vec<Map<String, Value>> = matched
            .into_iter()
            .skip(start)
            .take(resolved.per_page as usize)
            .collect();

        Ok(DataTableResponse::assemble(
            page,
            resolved.page,
            resolved.per_page,
            total_rows,
        ))
    }
}

fn row_matches(filters: &[ResolvedFilter], row: &Map<String, Value>) -> bool {
    filters.iter().all(|filter| match filter {
        ResolvedFilter::Null { column, negated } => {
            let is_null = row.get(column.name()).is_none_or(Value::is_null);
            is_null != *negated
        }
        ResolvedFilter::Like {
            column,
            prefix_only,
            term,
        } => row
            .get(column.name())
            .and_then(Value::as_str)
            .is_some_and(|cell| {
                let cell = cell.to_lowercase();
                let term = term.to_lowercase();
                if *prefix_only {
                    cell.starts_with(&term)
                } else {
                    cell.contains(&term)
                }
            }),
        ResolvedFilter::Compare { column, op, value } => row
            .get(column.name())
            .and_then(|cell| parse_cell(column.kind(), cell))
            .and_then(|cell| value_ordering(&cell, value))
            .is_some_and(|ordering| op.matches(ordering)),
    })
}

fn search_matches(columns: &[&Column], row: &Map<String, Value>, term: &str) -> bool {
    let term = term.to_lowercase();
    columns.iter().any(|column| {
        row.get(column.name())
            .and_then(Value::as_str)
            .is_some_and(|cell| cell.to_lowercase().contains(&term))
    })
}

/// Reads a JSON cell as the column's declared kind.
fn parse_cell(kind: ColumnKind, cell: &Value) -> Option<FilterValue> {
    match kind {
        ColumnKind::Text => cell.as_str().map(|text| FilterValue::Text(text.to_string())),
        ColumnKind::Number => cell.as_i64().map(FilterValue::Number),
        ColumnKind::Decimal => cell.as_f64().map(FilterValue::Decimal),
        ColumnKind::Bool => cell.as_bool().map(FilterValue::Bool),
        ColumnKind::Uuid => cell
            .as_str()
            .and_then(|text| Uuid::parse_str(text).ok())
            .map(FilterValue::Uuid),
        ColumnKind::Timestamp => cell
            .as_str()
            .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
            .map(|parsed| FilterValue::Timestamp(parsed.with_timezone(&Utc))),
    }
}

fn value_ordering(left: &FilterValue, right: &FilterValue) -> Option<Ordering> {
    match (left, right) {
        (FilterValue::Text(a), FilterValue::Text(b)) => Some(a.cmp(b)),
        (FilterValue::Number(a), FilterValue::Number(b)) => Some(a.cmp(b)),
        (FilterValue::Decimal(a), FilterValue::Decimal(b)) => a.partial_cmp(b),
        (FilterValue::Bool(a), FilterValue::Bool(b)) => Some(a.cmp(b)),
        (FilterValue::Uuid(a), FilterValue::Uuid(b)) => Some(a.cmp(b)),
        (FilterValue::Timestamp(a), FilterValue::Timestamp(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Null cells sort after present ones; descending order reverses that, which
/// mirrors Postgres defaults.
fn cell_ordering(column: &Column, left: &Map<String, Value>, right: &Map<String, Value>) -> Ordering {
    let left = left
        .get(column.name())
        .and_then(|cell| parse_cell(column.kind(), cell));
    let right = right
        .get(column.name())
        .and_then(|cell| parse_cell(column.kind(), cell));
    match (left, right) {
        (Some(left), Some(right)) => value_ordering(&left, &right).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
