//! `POST /upsert/{database}/{schema}/{table}`: normalize, render, dispatch.

use crate::context::RequestTimeout;
use crate::error::AppError;
use crate::response::raw_json;
use crate::service::{execute, read_body, resolve_timeout, TablePath, UpsertQuery, UpsertTarget};
use crate::state::AppState;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::Method;
use axum::response::Response;
use axum::Extension;

pub async fn upsert(
    State(state): State<AppState>,
    Path(path): Path<TablePath>,
    Query(query): Query<UpsertQuery>,
    timeout: Option<Extension<RequestTimeout>>,
    body: Body,
) -> Result<Response, AppError> {
    let batch = query.is_batch();
    let result = match UpsertTarget::from_request(path, &query, state.enforced_database()) {
        Ok(target) => run(&state, target, timeout.map(|Extension(t)| t), body).await,
        Err(e) => Err(e),
    };
    state.metrics.record_upsert(batch, result.is_ok());
    result
}

async fn run(
    state: &AppState,
    target: UpsertTarget,
    timeout: Option<RequestTimeout>,
    body: Body,
) -> Result<Response, AppError> {
    let bytes = read_body(body, state.config.max_body_bytes).await?;
    let req = target.with_body(&bytes)?;
    let template = req.template();
    let stmt = state.adapter.parse_script(template.name(), &req.template_params())?;
    tracing::debug!(
        template = template.name(),
        database = %req.path.database,
        keys = ?req.keys,
        "upsert rendered"
    );
    let timeout = resolve_timeout(timeout, &state.config);
    let rows = execute(state.adapter.as_ref(), &req.path.database, timeout, &Method::POST, &stmt).await?;
    Ok(raw_json(rows))
}
