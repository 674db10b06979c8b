//! Catalog queries behind the discovery endpoints.

use crate::sql::{PgBindValue, RenderedStatement};

fn fixed(source: &str, sql: &str) -> RenderedStatement {
    let mut q = RenderedStatement::new(source);
    q.sql = sql.to_string();
    q
}

pub fn list_databases() -> RenderedStatement {
    fixed(
        "databases",
        "SELECT datname AS name FROM pg_database WHERE NOT datistemplate ORDER BY datname",
    )
}

pub fn list_schemas() -> RenderedStatement {
    fixed(
        "schemas",
        "SELECT schema_name AS name FROM information_schema.schemata ORDER BY schema_name",
    )
}

pub fn list_tables() -> RenderedStatement {
    fixed(
        "tables",
        "SELECT table_schema AS schema, table_name AS name, table_type AS type \
         FROM information_schema.tables \
         WHERE table_schema NOT IN ('pg_catalog', 'information_schema') \
         ORDER BY table_schema, table_name",
    )
}

pub fn list_tables_in_schema(schema: &str) -> RenderedStatement {
    let mut q = RenderedStatement::new("tables_in_schema");
    let n = q.push_param(PgBindValue::Text(schema.to_string()));
    q.sql = format!(
        "SELECT table_name AS name, table_type AS type FROM information_schema.tables \
         WHERE table_schema = ${} ORDER BY table_name",
        n
    );
    q
}

pub fn show_table(schema: &str, table: &str) -> RenderedStatement {
    let mut q = RenderedStatement::new("show_table");
    let s = q.push_param(PgBindValue::Text(schema.to_string()));
    let t = q.push_param(PgBindValue::Text(table.to_string()));
    q.sql = format!(
        "SELECT column_name, data_type, is_nullable, column_default, ordinal_position \
         FROM information_schema.columns WHERE table_schema = ${} AND table_name = ${} \
         ORDER BY ordinal_position",
        s, t
    );
    q
}
