//! Generic table endpoints: select, insert, batch insert, update, delete.

use crate::context::RequestTimeout;
use crate::error::AppError;
use crate::response::raw_json;
use crate::service::{
    ensure_registered, execute, parse_batch_body, parse_object_body, query_filters, read_body,
    resolve_timeout, select_options, TablePath,
};
use crate::sql::{self, RenderedStatement};
use crate::state::AppState;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::Method;
use axum::response::Response;
use axum::Extension;

type Pairs = Query<Vec<(String, String)>>;
type Timeout = Option<Extension<RequestTimeout>>;

async fn dispatch(
    state: &AppState,
    path: &TablePath,
    timeout: Timeout,
    method: &Method,
    stmt: RenderedStatement,
) -> Result<Response, AppError> {
    let timeout = resolve_timeout(timeout.map(|Extension(t)| t), &state.config);
    let rows = execute(state.adapter.as_ref(), &path.database, timeout, method, &stmt).await?;
    Ok(raw_json(rows))
}

pub async fn select(
    State(state): State<AppState>,
    Path(path): Path<TablePath>,
    Query(pairs): Pairs,
    timeout: Timeout,
) -> Result<Response, AppError> {
    ensure_registered(state.enforced_database(), &path.database)?;
    let opts = select_options(&pairs)?;
    let stmt = sql::select(&path.schema, &path.table, &opts);
    dispatch(&state, &path, timeout, &Method::GET, stmt).await
}

pub async fn insert(
    State(state): State<AppState>,
    Path(path): Path<TablePath>,
    timeout: Timeout,
    body: Body,
) -> Result<Response, AppError> {
    ensure_registered(state.enforced_database(), &path.database)?;
    let bytes = read_body(body, state.config.max_body_bytes).await?;
    let row = parse_object_body(&bytes)?;
    let stmt = sql::insert(&path.schema, &path.table, &row);
    dispatch(&state, &path, timeout, &Method::POST, stmt).await
}

pub async fn batch_insert(
    State(state): State<AppState>,
    Path(path): Path<TablePath>,
    timeout: Timeout,
    body: Body,
) -> Result<Response, AppError> {
    ensure_registered(state.enforced_database(), &path.database)?;
    let bytes = read_body(body, state.config.max_body_bytes).await?;
    let rows = parse_batch_body(&bytes)?;
    let stmt = sql::batch_insert(&path.schema, &path.table, &rows);
    dispatch(&state, &path, timeout, &Method::POST, stmt).await
}

/// PUT and PATCH.
pub async fn update(
    State(state): State<AppState>,
    Path(path): Path<TablePath>,
    Query(pairs): Pairs,
    method: Method,
    timeout: Timeout,
    body: Body,
) -> Result<Response, AppError> {
    ensure_registered(state.enforced_database(), &path.database)?;
    let bytes = read_body(body, state.config.max_body_bytes).await?;
    let changes = parse_object_body(&bytes)?;
    let stmt = sql::update(&path.schema, &path.table, &changes, &query_filters(&pairs));
    dispatch(&state, &path, timeout, &method, stmt).await
}

pub async fn delete(
    State(state): State<AppState>,
    Path(path): Path<TablePath>,
    Query(pairs): Pairs,
    timeout: Timeout,
) -> Result<Response, AppError> {
    ensure_registered(state.enforced_database(), &path.database)?;
    let stmt = sql::delete(&path.schema, &path.table, &query_filters(&pairs));
    dispatch(&state, &path, timeout, &Method::DELETE, stmt).await
}
