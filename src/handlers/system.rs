//! Fixed endpoints: health, metrics, discovery, migrations, scripts, plugins, auth.

use crate::auth::Credentials;
use crate::error::{AppError, TemplateError};
use crate::migration::MigrationCommand;
use crate::response::{raw_json, text};
use crate::service::{ensure_registered, execute, resolve_timeout, TablePath};
use crate::sql::{catalog, RenderedStatement};
use crate::state::AppState;
use crate::template::{TemplateParams, TemplateValue};
use axum::extract::{Path, Query, Request, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

pub async fn health() -> &'static str {
    "ok"
}

pub async fn metrics(State(state): State<AppState>) -> Result<Response, AppError> {
    let body = state.metrics.render()?;
    Ok(([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response())
}

/// Fixed endpoints sit outside the timeout middleware, so the configured timeout applies.
async fn run_statement(
    state: &AppState,
    database: &str,
    method: &Method,
    stmt: RenderedStatement,
) -> Result<Response, AppError> {
    let timeout = resolve_timeout(None, &state.config);
    let rows = execute(state.adapter.as_ref(), database, timeout, method, &stmt).await?;
    Ok(raw_json(rows))
}

async fn read_catalog(state: &AppState, database: &str, stmt: RenderedStatement) -> Result<Response, AppError> {
    run_statement(state, database, &Method::GET, stmt).await
}

pub async fn databases(State(state): State<AppState>) -> Result<Response, AppError> {
    read_catalog(&state, &state.config.database, catalog::list_databases()).await
}

pub async fn schemas(State(state): State<AppState>) -> Result<Response, AppError> {
    read_catalog(&state, &state.config.database, catalog::list_schemas()).await
}

pub async fn tables(State(state): State<AppState>) -> Result<Response, AppError> {
    read_catalog(&state, &state.config.database, catalog::list_tables()).await
}

pub async fn tables_in_schema(
    State(state): State<AppState>,
    Path((database, schema)): Path<(String, String)>,
) -> Result<Response, AppError> {
    ensure_registered(state.enforced_database(), &database)?;
    read_catalog(&state, &database, catalog::list_tables_in_schema(&schema)).await
}

pub async fn show_table(State(state): State<AppState>, Path(path): Path<TablePath>) -> Result<Response, AppError> {
    ensure_registered(state.enforced_database(), &path.database)?;
    read_catalog(&state, &path.database, catalog::show_table(&path.schema, &path.table)).await
}

#[derive(Debug, Default, Deserialize)]
pub struct MigrationArgs {
    #[serde(default)]
    pub n: Option<String>,
}

/// Waits for the run. Success: ` ok \n` then one executed id per line. Failure: 500 with the error
/// followed by whatever executed before it.
pub async fn migrations(
    State(state): State<AppState>,
    Path(verb): Path<String>,
    Query(args): Query<MigrationArgs>,
) -> Response {
    let command = match args.n.as_deref().filter(|n| !n.is_empty()) {
        Some(n) => format!("{} {}", verb, n),
        None => verb,
    };
    let parsed: Result<MigrationCommand, AppError> = command.parse();
    let outcome = match parsed {
        Ok(cmd) => state.migrator.run(cmd).await,
        Err(e) => {
            tracing::warn!(command = %command, error = %e, "rejected migration command");
            return text(StatusCode::INTERNAL_SERVER_ERROR, format!("run migration error {}\n", e));
        }
    };
    let listed: String = outcome.executed.iter().map(|id| format!("{}\n", id)).collect();
    match outcome.error {
        None => {
            tracing::info!(command = %command, executed = outcome.executed.len(), "migrations done");
            text(StatusCode::OK, format!(" ok \n{}", listed))
        }
        Some(err) => text(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("run migration error {}\n{}", err, listed),
        ),
    }
}

/// Registry name for a script: `.read.sql` for GET, `.write.sql` otherwise, unless already suffixed.
pub fn script_name(location: &str, script: &str, method: &Method) -> String {
    if script.ends_with(".sql") {
        return format!("{}/{}", location, script);
    }
    let suffix = if method == Method::GET { "read" } else { "write" };
    format!("{}/{}.{}.sql", location, script, suffix)
}

pub async fn script(
    State(state): State<AppState>,
    Path((location, script)): Path<(String, String)>,
    Query(pairs): Query<Vec<(String, String)>>,
    method: Method,
) -> Result<Response, AppError> {
    let name = script_name(&location, &script, &method);
    let params = pairs
        .into_iter()
        .fold(TemplateParams::new(), |p, (k, v)| p.with(k, TemplateValue::Text(v)));
    let stmt = match state.adapter.parse_script(&name, &params) {
        Ok(stmt) => stmt,
        Err(TemplateError::UnknownTemplate { name }) => return Err(AppError::NotFound(name)),
        Err(e @ TemplateError::MissingParam { .. }) => return Err(AppError::Validation(e.to_string())),
        Err(e) => return Err(e.into()),
    };
    run_statement(&state, &state.config.database, &method, stmt).await
}

pub async fn plugin(
    State(state): State<AppState>,
    Path((file, func)): Path<(String, String)>,
    req: Request,
) -> Result<Response, AppError> {
    let handler = state
        .extensions
        .handler(&file, &func)
        .ok_or_else(|| AppError::NotFound(format!("plugin {}/{}", file, func)))?;
    Ok(handler.call(req).await)
}

pub async fn auth(State(state): State<AppState>, Json(credentials): Json<Credentials>) -> Result<Response, AppError> {
    let authenticator = state
        .authenticator
        .clone()
        .ok_or_else(|| AppError::NotImplemented("no authenticator installed".into()))?;
    let token = authenticator.authenticate(&credentials).await?;
    Ok(Json(token).into_response())
}
