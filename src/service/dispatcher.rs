//! Execution Dispatcher: bind the database and deadline, run the statement, map the outcome.

use crate::adapter::Adapter;
use crate::config::GatewayConfig;
use crate::context::{ExecutionContext, RequestTimeout};
use crate::error::AppError;
use crate::sql::RenderedStatement;
use axum::body::Bytes;
use axum::http::Method;
use std::time::Duration;

/// Timeout attached by the timeout middleware, or the configured one when the annotation is missing.
pub fn resolve_timeout(annotated: Option<RequestTimeout>, config: &GatewayConfig) -> Duration {
    match annotated {
        Some(RequestTimeout(secs)) if secs > 0 => Duration::from_secs(secs),
        _ => config.http_timeout(),
    }
}

/// Run `stmt` against `database`. Success bytes are returned untouched; failures embed the inlined statement.
pub async fn execute(
    adapter: &dyn Adapter,
    database: &str,
    timeout: Duration,
    method: &Method,
    stmt: &RenderedStatement,
) -> Result<Bytes, AppError> {
    let ctx = ExecutionContext::new(database, timeout);
    let result = adapter.execute(&ctx, method, stmt).await;
    drop(ctx);
    result.map_err(|e| AppError::Execution {
        statement: stmt.inline_sql(),
        message: e.to_string(),
    })
}
