//! Database adapter contract: render named templates and execute statements under an execution context.

mod postgres;
pub use postgres::PgAdapter;

use crate::context::{ExecutionContext, Interrupted};
use crate::error::TemplateError;
use crate::sql::RenderedStatement;
use crate::template::TemplateParams;
use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::Method;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error(transparent)]
    Db(#[from] sqlx::Error),
    #[error(transparent)]
    Interrupted(#[from] Interrupted),
    #[error("{0}")]
    Other(String),
}

/// Shared by every request; implementations must be safe for concurrent use and must not
/// keep per-request state. The target database travels in the `ExecutionContext`.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Render a named template into an executable statement.
    fn parse_script(&self, name: &str, params: &TemplateParams) -> Result<RenderedStatement, TemplateError>;

    /// Run `stmt` against `ctx.database()`. Returns the result rows as a JSON array, or
    /// `{"rows_affected": N}` when the statement's `ResultShape` is `RowsAffected`.
    /// Must observe the context's deadline and cancellation.
    async fn execute(
        &self,
        ctx: &ExecutionContext,
        method: &Method,
        stmt: &RenderedStatement,
    ) -> Result<Bytes, AdapterError>;
}

/// Wrap a `Rows` statement so it yields its rows as one JSON array (text). Writes go in a CTE so
/// data-modifying statements with RETURNING are allowed.
pub fn json_rows_sql(method: &Method, sql: &str) -> String {
    let body = sql.trim().trim_end_matches(';').trim_end();
    if method == Method::GET {
        format!(
            "SELECT COALESCE(json_agg(gateway_rows), '[]'::json)::text FROM (\n{}\n) AS gateway_rows",
            body
        )
    } else {
        format!(
            "WITH gateway_rows AS (\n{}\n) SELECT COALESCE(json_agg(gateway_rows), '[]'::json)::text FROM gateway_rows",
            body
        )
    }
}

/// How a statement's result reaches the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultShape {
    /// A JSON array of the rows it yields.
    Rows,
    /// `{"rows_affected": N}` for writes that return nothing.
    RowsAffected,
}

impl ResultShape {
    pub fn of(sql: &str) -> ResultShape {
        let words = keywords(sql);
        let has = |kw: &str| words.iter().any(|w| w == kw);
        match words.first().map(String::as_str) {
            Some("select" | "values" | "table" | "show" | "explain") => ResultShape::Rows,
            _ if has("returning") => ResultShape::Rows,
            Some("with") if !["insert", "update", "delete", "merge"].iter().any(|kw| has(kw)) => ResultShape::Rows,
            _ => ResultShape::RowsAffected,
        }
    }
}

/// Lowercased bare words of `sql`, skipping comments, string literals and quoted identifiers.
fn keywords(sql: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut chars = sql.chars().peekable();
    let mut word = String::new();
    while let Some(c) = chars.next() {
        if c.is_alphanumeric() || c == '_' {
            word.push(c.to_ascii_lowercase());
            continue;
        }
        if !word.is_empty() {
            words.push(std::mem::take(&mut word));
        }
        match c {
            '-' if chars.peek() == Some(&'-') => {
                for n in chars.by_ref() {
                    if n == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = ' ';
                for n in chars.by_ref() {
                    if prev == '*' && n == '/' {
                        break;
                    }
                    prev = n;
                }
            }
            '\'' | '"' => {
                for n in chars.by_ref() {
                    if n == c {
                        break;
                    }
                }
            }
            _ => {}
        }
    }
    if !word.is_empty() {
        words.push(word);
    }
    words
}
