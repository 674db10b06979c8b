//! Builds parameterized SELECT, INSERT, UPDATE, DELETE for any schema.table.
//! Identifiers are quoted; values are bound as text and typed by the table's own row type
//! through `json_populate_record(set)`.

use crate::sql::{quote_ident, PgBindValue, RenderedStatement};
use serde_json::{Map, Value};

/// Page size cap for SELECT.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Full qualified table name.
pub fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

/// SELECT options parsed from the query string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectOptions {
    /// Empty means `*`.
    pub columns: Vec<String>,
    /// Exact match on the column's text form.
    pub filters: Vec<(String, String)>,
    pub order: Vec<OrderBy>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

fn push_where(stmt: &mut RenderedStatement, filters: &[(String, String)], alias: Option<&str>) -> String {
    if filters.is_empty() {
        return String::new();
    }
    let prefix = alias.map(|a| format!("{}.", a)).unwrap_or_default();
    let parts: Vec<String> = filters
        .iter()
        .map(|(col, val)| {
            let n = stmt.push_param(PgBindValue::Text(val.clone()));
            format!("{}{}::text = ${}", prefix, quote_ident(col), n)
        })
        .collect();
    format!(" WHERE {}", parts.join(" AND "))
}

fn column_list<'a, I>(columns: I) -> String
where
    I: IntoIterator<Item = &'a String>,
{
    columns.into_iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", ")
}

pub fn select(schema: &str, table: &str, opts: &SelectOptions) -> RenderedStatement {
    let mut q = RenderedStatement::new("select");
    let cols = if opts.columns.is_empty() {
        "*".to_string()
    } else {
        column_list(&opts.columns)
    };
    let where_clause = push_where(&mut q, &opts.filters, None);
    let order_clause = if opts.order.is_empty() {
        String::new()
    } else {
        let parts: Vec<String> = opts
            .order
            .iter()
            .map(|o| format!("{} {}", quote_ident(&o.column), if o.descending { "DESC" } else { "ASC" }))
            .collect();
        format!(" ORDER BY {}", parts.join(", "))
    };
    let limit_clause = opts.limit.map(|n| format!(" LIMIT {}", n.min(MAX_PAGE_SIZE))).unwrap_or_default();
    let offset_clause = opts.offset.map(|n| format!(" OFFSET {}", n)).unwrap_or_default();
    q.sql = format!(
        "SELECT {} FROM {}{}{}{}{}",
        cols,
        qualified_table(schema, table),
        where_clause,
        order_clause,
        limit_clause,
        offset_clause
    );
    q
}

/// INSERT one row; columns are the body's keys.
pub fn insert(schema: &str, table: &str, body: &Map<String, Value>) -> RenderedStatement {
    let mut q = RenderedStatement::new("insert");
    let table = qualified_table(schema, table);
    let cols = column_list(body.keys());
    let n = q.push_param(PgBindValue::Text(Value::Object(body.clone()).to_string()));
    q.sql = format!(
        "INSERT INTO {t} ({c}) SELECT {c} FROM json_populate_record(NULL::{t}, ${n}::json) RETURNING *",
        t = table,
        c = cols,
        n = n
    );
    q
}

/// INSERT many rows in one statement. Columns are the union of all keys in first-seen order;
/// an item missing a column inserts NULL for it.
pub fn batch_insert(schema: &str, table: &str, items: &[Map<String, Value>]) -> RenderedStatement {
    let mut q = RenderedStatement::new("batch_insert");
    let table = qualified_table(schema, table);
    let mut columns: Vec<&String> = Vec::new();
    for item in items {
        for k in item.keys() {
            if !columns.contains(&k) {
                columns.push(k);
            }
        }
    }
    let cols = column_list(columns);
    let payload = Value::Array(items.iter().cloned().map(Value::Object).collect());
    let n = q.push_param(PgBindValue::Text(payload.to_string()));
    q.sql = format!(
        "INSERT INTO {t} ({c}) SELECT {c} FROM json_populate_recordset(NULL::{t}, ${n}::json) RETURNING *",
        t = table,
        c = cols,
        n = n
    );
    q
}

/// UPDATE rows matching `filters`; SET only the body's keys.
pub fn update(
    schema: &str,
    table: &str,
    body: &Map<String, Value>,
    filters: &[(String, String)],
) -> RenderedStatement {
    let mut q = RenderedStatement::new("update");
    let table = qualified_table(schema, table);
    let sets: Vec<String> = body
        .keys()
        .map(|k| format!("{c} = source.{c}", c = quote_ident(k)))
        .collect();
    let n = q.push_param(PgBindValue::Text(Value::Object(body.clone()).to_string()));
    let where_clause = push_where(&mut q, filters, Some("target"));
    q.sql = format!(
        "UPDATE {t} AS target SET {s} FROM json_populate_record(NULL::{t}, ${n}::json) AS source{w} RETURNING target.*",
        t = table,
        s = sets.join(", "),
        n = n,
        w = where_clause
    );
    q
}

/// DELETE rows matching `filters`.
pub fn delete(schema: &str, table: &str, filters: &[(String, String)]) -> RenderedStatement {
    let mut q = RenderedStatement::new("delete");
    let where_clause = push_where(&mut q, filters, None);
    q.sql = format!(
        "DELETE FROM {}{} RETURNING *",
        qualified_table(schema, table),
        where_clause
    );
    q
}
