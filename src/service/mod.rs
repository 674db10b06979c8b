//! Request pipeline: normalize inputs, render templates, dispatch to the adapter.

mod crud;
mod dispatcher;
mod upsert;
pub use crud::{parse_batch_body, parse_object_body, query_filters, select_options};
pub use dispatcher::{execute, resolve_timeout};
pub use upsert::{UpsertPayload, UpsertQuery, UpsertRequest, UpsertTarget};

use crate::error::AppError;
use axum::body::{Body, Bytes};
use serde::Deserialize;

/// `{database}/{schema}/{table}` path segments, opaque strings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TablePath {
    pub database: String,
    pub schema: String,
    pub table: String,
}

/// In single-database mode, refuse any database other than the configured one.
pub fn ensure_registered(enforced: Option<&str>, database: &str) -> Result<(), AppError> {
    match enforced {
        Some(configured) if configured != database => {
            Err(AppError::Validation(format!("database not registered: {}", database)))
        }
        _ => Ok(()),
    }
}

/// Buffer the whole body once.
pub async fn read_body(body: Body, limit: usize) -> Result<Bytes, AppError> {
    axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| AppError::Validation(format!("readall body: {}", e)))
}
