//! Admin datatable schemas and SQL building.
//!
//! Translates a client-shaped table request (paging, sorting, column
//! filters, global search) into SQL against a whitelisted [`TableSchema`].
//! Column names never come from the request: every referenced column must
//! exist in the schema or the request is rejected, and all values bind as
//! numbered parameters.

use std::cmp::Ordering;

use app::datatable::{
    AdminTable, ColumnKind, DataTableError, DataTableRequest, Filter, FilterOp, FilterValue,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// One whitelisted column.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    name: &'static str,
    kind: ColumnKind,
    searchable: bool,
}

impl Column {
    const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Column {
            name,
            kind,
            searchable: false,
        }
    }

    const fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn is_searchable(&self) -> bool {
        self.searchable
    }
}

/// The columns one admin table exposes, keyed by their SQL identifiers.
#[derive(Debug, Clone, Copy)]
pub struct TableSchema {
    table: &'static str,
    columns: &'static [Column],
    default_sort: (&'static str, bool),
}

impl TableSchema {
    pub fn for_table(table: AdminTable) -> Self {
        match table {
            AdminTable::Products => Self::products(),
            AdminTable::Orders => Self::orders(),
            AdminTable::Users => Self::users(),
        }
    }

    /// The products admin table.
    pub fn products() -> Self {
        const COLUMNS: &[Column] = &[
            Column::new("id", ColumnKind::Uuid),
            Column::new("slug", ColumnKind::Text).searchable(),
            Column::new("name", ColumnKind::Text).searchable(),
            Column::new("status", ColumnKind::Text),
            Column::new("base_price_cents", ColumnKind::Number),
            Column::new("currency", ColumnKind::Text),
            Column::new("created_at", ColumnKind::Timestamp),
            Column::new("updated_at", ColumnKind::Timestamp),
        ];
        Self {
            table: "products",
            columns: COLUMNS,
            default_sort: ("updated_at", true),
        }
    }

    /// The orders admin table.
    pub fn orders() -> Self {
        const COLUMNS: &[Column] = &[
            Column::new("id", ColumnKind::Uuid),
            Column::new("user_id", ColumnKind::Uuid),
            Column::new("status", ColumnKind::Text),
            Column::new("payment_status", ColumnKind::Text),
            Column::new("total_cents", ColumnKind::Number),
            Column::new("currency", ColumnKind::Text),
            Column::new("created_at", ColumnKind::Timestamp),
            Column::new("updated_at", ColumnKind::Timestamp),
        ];
        Self {
            table: "orders",
            columns: COLUMNS,
            default_sort: ("created_at", true),
        }
    }

    /// The users admin table.
    pub fn users() -> Self {
        const COLUMNS: &[Column] = &[
            Column::new("id", ColumnKind::Uuid),
            Column::new("email", ColumnKind::Text).searchable(),
            Column::new("role", ColumnKind::Text),
            Column::new("status", ColumnKind::Text),
            Column::new("created_at", ColumnKind::Timestamp),
            Column::new("updated_at", ColumnKind::Timestamp),
        ];
        Self {
            table: "users",
            columns: COLUMNS,
            default_sort: ("created_at", true),
        }
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn columns(&self) -> &'static [Column] {
        self.columns
    }

    fn column(&self, name: &str) -> Option<&'static Column> {
        self.columns.iter().find(|column| column.name == name)
    }
}

// Comparison operators that survive validation. `Contains`/`StartsWith`
// become `Like` filters and the null checks their own variant, so the SQL
// and in-memory executors never see an operator they cannot apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompareOp {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    pub(crate) fn sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "<>",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        }
    }

    pub(crate) fn matches(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::NotEq => ordering != Ordering::Equal,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Gte => ordering != Ordering::Less,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Lte => ordering != Ordering::Greater,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum ResolvedFilter {
    Compare {
        column: &'static Column,
        op: CompareOp,
        value: FilterValue,
    },
    Like {
        column: &'static Column,
        prefix_only: bool,
        term: String,
    },
    Null {
        column: &'static Column,
        negated: bool,
    },
}

/// A request validated against a schema.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedQuery {
    pub(crate) table: &'static str,
    pub(crate) columns: &'static [Column],
    pub(crate) filters: Vec<ResolvedFilter>,
    pub(crate) search: Option<String>,
    pub(crate) search_columns: Vec<&'static Column>,
    pub(crate) sort: (&'static Column, bool),
    pub(crate) page: u32,
    pub(crate) per_page: u32,
}

/// Validates the request against the schema, rejecting unknown columns and
/// operator/kind mismatches, and coercing textual UUID and timestamp values.
pub(crate) fn resolve(
    schema: &TableSchema,
    request: &DataTableRequest,
) -> Result<ResolvedQuery, DataTableError> {
    let mut filters = Vec::with_capacity(request.filters.len());
    for filter in &request.filters {
        let column = schema
            .column(&filter.column)
            .ok_or_else(|| DataTableError::UnknownColumn(filter.column.clone()))?;
        filters.push(resolve_filter(column, filter)?);
    }

    let search = request
        .search
        .as_deref()
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(str::to_string);
    let search_columns: Vec<&'static Column> = schema
        .columns
        .iter()
        .filter(|column| column.searchable)
        .collect();
    let search = if search_columns.is_empty() {
        None
    } else {
        search
    };

    let sort = match &request.sort {
        Some(sort) => {
            let column = schema
                .column(&sort.column)
                .ok_or_else(|| DataTableError::UnknownColumn(sort.column.clone()))?;
            (column, sort.descending)
        }
        None => {
            let (name, descending) = schema.default_sort;
            let column = schema
                .column(name)
                .ok_or_else(|| DataTableError::UnknownColumn(name.to_string()))?;
            (column, descending)
        }
    };

    Ok(ResolvedQuery {
        table: schema.table,
        columns: schema.columns,
        filters,
        search,
        search_columns,
        sort,
        page: request.page.max(1),
        per_page: request.per_page.max(1),
    })
}

fn resolve_filter(
    column: &'static Column,
    filter: &Filter,
) -> Result<ResolvedFilter, DataTableError> {
    let compare_op = match filter.op {
        FilterOp::IsNull => {
            return Ok(ResolvedFilter::Null {
                column,
                negated: false,
            });
        }
        FilterOp::NotNull => {
            return Ok(ResolvedFilter::Null {
                column,
                negated: true,
            });
        }
        FilterOp::Contains | FilterOp::StartsWith => {
            if column.kind != ColumnKind::Text {
                return Err(DataTableError::UnsupportedOp {
                    op: filter.op,
                    column: column.name.to_string(),
                });
            }
            let Some(FilterValue::Text(term)) = &filter.value else {
                return Err(DataTableError::InvalidValue {
                    column: column.name.to_string(),
                    kind: ColumnKind::Text,
                });
            };
            return Ok(ResolvedFilter::Like {
                column,
                prefix_only: filter.op == FilterOp::StartsWith,
                term: term.clone(),
            });
        }
        FilterOp::Eq => CompareOp::Eq,
        FilterOp::NotEq => CompareOp::NotEq,
        FilterOp::Gt => CompareOp::Gt,
        FilterOp::Gte => CompareOp::Gte,
        FilterOp::Lt => CompareOp::Lt,
        FilterOp::Lte => CompareOp::Lte,
    };

    if matches!(
        compare_op,
        CompareOp::Gt | CompareOp::Gte | CompareOp::Lt | CompareOp::Lte
    ) && !matches!(
        column.kind,
        ColumnKind::Number | ColumnKind::Decimal | ColumnKind::Timestamp
    ) {
        return Err(DataTableError::UnsupportedOp {
            op: filter.op,
            column: column.name.to_string(),
        });
    }

    let value = filter
        .value
        .as_ref()
        .ok_or_else(|| DataTableError::MissingValue {
            column: column.name.to_string(),
        })?;
    let value = coerce_value(column, value)?;

    Ok(ResolvedFilter::Compare {
        column,
        op: compare_op,
        value,
    })
}

/// Checks the value against the column kind, widening integers for decimal
/// columns and parsing textual UUIDs and timestamps.
fn coerce_value(column: &Column, value: &FilterValue) -> Result<FilterValue, DataTableError> {
    let mismatch = || DataTableError::InvalidValue {
        column: column.name.to_string(),
        kind: column.kind,
    };

    match (column.kind, value) {
        (ColumnKind::Text, FilterValue::Text(_))
        | (ColumnKind::Number, FilterValue::Number(_))
        | (ColumnKind::Decimal, FilterValue::Decimal(_))
        | (ColumnKind::Bool, FilterValue::Bool(_))
        | (ColumnKind::Uuid, FilterValue::Uuid(_))
        | (ColumnKind::Timestamp, FilterValue::Timestamp(_)) => Ok(value.clone()),
        (ColumnKind::Decimal, FilterValue::Number(n)) => Ok(FilterValue::Decimal(*n as f64)),
        (ColumnKind::Uuid, FilterValue::Text(text)) => Uuid::parse_str(text)
            .map(FilterValue::Uuid)
            .map_err(|_| mismatch()),
        (ColumnKind::Timestamp, FilterValue::Text(text)) => DateTime::parse_from_rfc3339(text)
            .map(|parsed| FilterValue::Timestamp(parsed.with_timezone(&Utc)))
            .map_err(|_| mismatch()),
        _ => Err(mismatch()),
    }
}

/// A SQL string with its positional binds, in bind order.
#[derive(Debug, Clone)]
pub(crate) struct BuiltQuery {
    pub(crate) sql: String,
    pub(crate) binds: Vec<FilterValue>,
}

/// Escapes LIKE wildcards so user input matches literally.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn where_clause(resolved: &ResolvedQuery, binds: &mut Vec<FilterValue>) -> String {
    let mut conditions = Vec::new();

    for filter in &resolved.filters {
        let clause = match filter {
            ResolvedFilter::Null { column, negated } => {
                format!(
                    "{} IS {}NULL",
                    column.name,
                    if *negated { "NOT " } else { "" }
                )
            }
            ResolvedFilter::Like {
                column,
                prefix_only,
                term,
            } => {
                let escaped = escape_like(term);
                let pattern = if *prefix_only {
                    format!("{escaped}%")
                } else {
                    format!("%{escaped}%")
                };
                binds.push(FilterValue::Text(pattern));
                format!("{} ILIKE ${}", column.name, binds.len())
            }
            ResolvedFilter::Compare { column, op, value } => {
                binds.push(value.clone());
                format!("{} {} ${}", column.name, op.sql(), binds.len())
            }
        };
        conditions.push(clause);
    }

    if let Some(term) = &resolved.search {
        let pattern = format!("%{}%", escape_like(term));
        binds.push(FilterValue::Text(pattern));
        let placeholder = binds.len();
        let searches: Vec<String> = resolved
            .search_columns
            .iter()
            .map(|column| format!("{} ILIKE ${placeholder}", column.name))
            .collect();
        conditions.push(format!("({})", searches.join(" OR ")));
    }

    if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    }
}

/// The page query: selected columns, filters, ordering and paging.
pub(crate) fn build_data_query(resolved: &ResolvedQuery) -> BuiltQuery {
    let mut binds = Vec::new();
    let columns: Vec<&str> = resolved.columns.iter().map(|column| column.name).collect();
    let mut sql = format!("SELECT {} FROM {}", columns.join(", "), resolved.table);
    sql.push_str(&where_clause(resolved, &mut binds));

    let (sort_column, descending) = resolved.sort;
    sql.push_str(&format!(
        " ORDER BY {} {}",
        sort_column.name,
        if descending { "DESC" } else { "ASC" }
    ));
    // Stable tiebreak so pages never overlap.
    if sort_column.name != "id" {
        sql.push_str(", id ASC");
    }

    let offset = i64::from(resolved.page - 1) * i64::from(resolved.per_page);
    binds.push(FilterValue::Number(i64::from(resolved.per_page)));
    sql.push_str(&format!(" LIMIT ${}", binds.len()));
    binds.push(FilterValue::Number(offset));
    sql.push_str(&format!(" OFFSET ${}", binds.len()));

    BuiltQuery { sql, binds }
}

/// The matching row count, sharing the page query's WHERE clause.
pub(crate) fn build_count_query(resolved: &ResolvedQuery) -> BuiltQuery {
    let mut binds = Vec::new();
    let mut sql = format!("SELECT COUNT(*) FROM {}", resolved.table);
    sql.push_str(&where_clause(resolved, &mut binds));
    BuiltQuery { sql, binds }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(column: &str, op: FilterOp, value: Option<FilterValue>) -> Filter {
        Filter {
            column: column.to_string(),
            op,
            value,
        }
    }

    #[test]
    fn test_schema_lookup_by_table() {
        assert_eq!(TableSchema::for_table(AdminTable::Products).table(), "products");
        assert_eq!(TableSchema::for_table(AdminTable::Orders).table(), "orders");
        assert_eq!(TableSchema::for_table(AdminTable::Users).table(), "users");
    }

    #[test]
    fn test_unknown_filter_column_rejected() {
        let mut request = DataTableRequest::new(1, 10);
        request.filters.push(filter(
            "password_hash",
            FilterOp::Eq,
            Some(FilterValue::Text("x".into())),
        ));

        let err = resolve(&TableSchema::users(), &request).unwrap_err();
        assert_eq!(err, DataTableError::UnknownColumn("password_hash".into()));
    }

    #[test]
    fn test_unknown_sort_column_rejected() {
        let mut request = DataTableRequest::new(1, 10);
        request.sort = Some(app::datatable::Sort {
            column: "document".to_string(),
            descending: false,
        });

        let err = resolve(&TableSchema::products(), &request).unwrap_err();
        assert_eq!(err, DataTableError::UnknownColumn("document".into()));
    }

    #[test]
    fn test_comparison_requires_a_value() {
        let mut request = DataTableRequest::new(1, 10);
        request.filters.push(filter("status", FilterOp::Eq, None));

        let err = resolve(&TableSchema::orders(), &request).unwrap_err();
        assert_eq!(
            err,
            DataTableError::MissingValue {
                column: "status".into()
            }
        );
    }

    #[test]
    fn test_contains_only_applies_to_text_columns() {
        let mut request = DataTableRequest::new(1, 10);
        request.filters.push(filter(
            "total_cents",
            FilterOp::Contains,
            Some(FilterValue::Text("19".into())),
        ));

        let err = resolve(&TableSchema::orders(), &request).unwrap_err();
        assert_eq!(
            err,
            DataTableError::UnsupportedOp {
                op: FilterOp::Contains,
                column: "total_cents".into()
            }
        );
    }

    #[test]
    fn test_ordering_ops_rejected_on_text_columns() {
        let mut request = DataTableRequest::new(1, 10);
        request.filters.push(filter(
            "status",
            FilterOp::Gt,
            Some(FilterValue::Text("pending".into())),
        ));

        let err = resolve(&TableSchema::orders(), &request).unwrap_err();
        assert!(matches!(err, DataTableError::UnsupportedOp { .. }));
    }

    #[test]
    fn test_textual_uuid_is_coerced() {
        let id = Uuid::new_v4();
        let mut request = DataTableRequest::new(1, 10);
        request.filters.push(filter(
            "user_id",
            FilterOp::Eq,
            Some(FilterValue::Text(id.to_string())),
        ));

        let resolved = resolve(&TableSchema::orders(), &request).unwrap();
        match &resolved.filters[0] {
            ResolvedFilter::Compare { value, .. } => {
                assert_eq!(value, &FilterValue::Uuid(id));
            }
            other => panic!("expected a comparison, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_uuid_text_rejected() {
        let mut request = DataTableRequest::new(1, 10);
        request.filters.push(filter(
            "user_id",
            FilterOp::Eq,
            Some(FilterValue::Text("not-a-uuid".into())),
        ));

        let err = resolve(&TableSchema::orders(), &request).unwrap_err();
        assert_eq!(
            err,
            DataTableError::InvalidValue {
                column: "user_id".into(),
                kind: ColumnKind::Uuid
            }
        );
    }

    #[test]
    fn test_data_query_numbers_parameters() {
        let mut request = DataTableRequest::new(2, 10);
        request.search = Some("wid".to_string());
        request.sort = Some(app::datatable::Sort {
            column: "name".to_string(),
            descending: false,
        });
        request.filters.push(filter(
            "status",
            FilterOp::Eq,
            Some(FilterValue::Text("active".into())),
        ));

        let resolved = resolve(&TableSchema::products(), &request).unwrap();
        let query = build_data_query(&resolved);

        assert_eq!(
            query.sql,
            "SELECT id, slug, name, status, base_price_cents, currency, created_at, updated_at \
             FROM products WHERE status = $1 AND (slug ILIKE $2 OR name ILIKE $2) \
             ORDER BY name ASC, id ASC LIMIT $3 OFFSET $4"
        );
        assert_eq!(
            query.binds,
            vec![
                FilterValue::Text("active".into()),
                FilterValue::Text("%wid%".into()),
                FilterValue::Number(10),
                FilterValue::Number(10),
            ]
        );
    }

    #[test]
    fn test_count_query_shares_the_where_clause() {
        let mut request = DataTableRequest::new(1, 25);
        request.filters.push(filter(
            "total_cents",
            FilterOp::Gte,
            Some(FilterValue::Number(5000)),
        ));

        let resolved = resolve(&TableSchema::orders(), &request).unwrap();
        let query = build_count_query(&resolved);

        assert_eq!(
            query.sql,
            "SELECT COUNT(*) FROM orders WHERE total_cents >= $1"
        );
        assert_eq!(query.binds, vec![FilterValue::Number(5000)]);
    }

    #[test]
    fn test_default_sort_applies_when_unspecified() {
        let request = DataTableRequest::new(1, 10);
        let resolved = resolve(&TableSchema::products(), &request).unwrap();
        let query = build_data_query(&resolved);
        assert!(query.sql.contains("ORDER BY updated_at DESC, id ASC"));
    }

    #[test]
    fn test_search_is_dropped_without_searchable_columns() {
        // Orders expose no searchable columns; the term must not reach SQL.
        let mut request = DataTableRequest::new(1, 10);
        request.search = Some("anything".to_string());

        let resolved = resolve(&TableSchema::orders(), &request).unwrap();
        let query = build_data_query(&resolved);
        assert!(!query.sql.contains("ILIKE"));
    }

    #[test]
    fn test_like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");

        let mut request = DataTableRequest::new(1, 10);
        request.filters.push(filter(
            "name",
            FilterOp::Contains,
            Some(FilterValue::Text("100%".into())),
        ));
        let resolved = resolve(&TableSchema::products(), &request).unwrap();
        let query = build_data_query(&resolved);
        assert_eq!(query.binds[0], FilterValue::Text("%100\\%%".into()));
    }

    #[test]
    fn test_timestamp_text_is_coerced() {
        let mut request = DataTableRequest::new(1, 10);
        request.filters.push(filter(
            "created_at",
            FilterOp::Gte,
            Some(FilterValue::Text("2026-01-01T00:00:00Z".into())),
        ));

        let resolved = resolve(&TableSchema::orders(), &request).unwrap();
        match &resolved.filters[0] {
            ResolvedFilter::Compare { op, value, .. } => {
                assert_eq!(*op, CompareOp::Gte);
                assert!(matches!(value, FilterValue::Timestamp(_)));
            }
            other => panic!("expected a comparison, got {other:?}"),
        }
    }
}
