//! Postgres datatable backend.

use app::datatable::{
    AdminTable, AdminTables, ColumnKind, DataTableError, DataTableRequest, DataTableResponse,
    FilterValue,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Number, Value};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::datatable::{Column, TableSchema, build_count_query, build_data_query, resolve};

/// Runs resolved datatable queries against the extracted columns.
#[derive(Clone)]
pub struct PostgresTables {
    pool: PgPool,
}

impl PostgresTables {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

macro_rules! bind_values {
    ($query:expr, $binds:expr) => {{
        let mut query = $query;
        for value in $binds {
            query = match value {
                FilterValue::Bool(value) => query.bind(*value),
                FilterValue::Number(value) => query.bind(*value),
                FilterValue::Decimal(value) => query.bind(*value),
                FilterValue::Uuid(value) => query.bind(*value),
                FilterValue::Timestamp(value) => query.bind(*value),
                FilterValue::Text(value) => query.bind(value.as_str()),
            };
        }
        query
    }};
}

#[async_trait]
impl AdminTables for PostgresTables {
    #[tracing::instrument(skip(self, request), fields(table = table.as_str(), page = request.page))]
    async fn execute(
        &self,
        table: AdminTable,
        request: &DataTableRequest,
    ) -> Result<DataTableResponse, DataTableError> {
        let schema = TableSchema::for_table(table);
        let resolved = resolve(&schema, request)?;

        let count = build_count_query(&resolved);
        let total_rows: i64 = bind_values!(sqlx::query_scalar(&count.sql), &count.binds)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| DataTableError::Backend(err.to_string()))?;

        let data = build_data_query(&resolved);
        let rows = bind_values!(sqlx::query(&data.sql), &data.binds)
            .fetch_all(&self.pool)
            .await
            .map_err(|err| DataTableError::Backend(err.to_string()))?;

        let rows = rows
            .iter()
            .map(|row| row_to_json(resolved.columns, row))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DataTableResponse::assemble(
            rows,
            resolved.page,
            resolved.per_page,
            total_rows as u64,
        ))
    }
}

/// Reads each schema column into a JSON object, rendering UUIDs and
/// timestamps as strings so rows serialize the same as the in-memory
/// backend.
fn row_to_json(columns: &[Column], row: &PgRow) -> Result<Map<String, Value>, DataTableError> {
    let mut object = Map::with_capacity(columns.len());
    for column in columns {
        let cell = read_cell(column, row)
            .map_err(|err| DataTableError::Backend(err.to_string()))?;
        object.insert(column.name().to_string(), cell);
    }
    Ok(object)
}

fn read_cell(column: &Column, row: &PgRow) -> Result<Value, sqlx::Error> {
    let name = column.name();
    let cell = match column.kind() {
        ColumnKind::Text => row
            .try_get::<Option<String>, _>(name)?
            .map_or(Value::Null, Value::String),
        ColumnKind::Number => row
            .try_get::<Option<i64>, _>(name)?
            .map_or(Value::Null, |value| Value::Number(value.into())),
        ColumnKind::Decimal => row
            .try_get::<Option<f64>, _>(name)?
            .and_then(Number::from_f64)
            .map_or(Value::Null, Value::Number),
        ColumnKind::Bool => row
            .try_get::<Option<bool>, _>(name)?
            .map_or(Value::Null, Value::Bool),
        ColumnKind::Uuid => row
            .try_get::<Option<Uuid>, _>(name)?
            .map_or(Value::Null, |value| Value::String(value.to_string())),
        ColumnKind::Timestamp => row
            .try_get::<Option<DateTime<Utc>>, _>(name)?
            .map_or(Value::Null, |value| Value::String(value.to_rfc3339())),
    };
    Ok(cell)
}
