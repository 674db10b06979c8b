//! Route table: fixed endpoints plus table routes behind the cache → plugin → timeout chain.

use crate::handlers::{system, table, upsert};
use crate::middleware;
use crate::state::AppState;
use axum::routing::{any, get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Table routes. `{database}`, `{schema}` and `{table}` are opaque segments.
fn table_routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/:database/:schema/:table",
            get(table::select)
                .post(table::insert)
                .put(table::update)
                .patch(table::update)
                .delete(table::delete),
        )
        .route("/batch/:database/:schema/:table", post(table::batch_insert))
        .route("/upsert/:database/:schema/:table", post(upsert))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::cache))
                .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::plugin))
                .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::timeout)),
        )
        .with_state(state)
}

fn fixed_routes(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(system::health))
        .route("/metrics", get(system::metrics))
        .route("/databases", get(system::databases))
        .route("/schemas", get(system::schemas))
        .route("/tables", get(system::tables))
        .route("/migrations/:verb", get(system::migrations))
        .route("/_QUERIES/:location/:script", any(system::script))
        .route("/_PLUGIN/:file/:func", any(system::plugin))
        .route("/show/:database/:schema/:table", get(system::show_table))
        .route("/:database/:schema", get(system::tables_in_schema));
    if state.config.auth_enabled {
        router = router.route("/auth", post(system::auth));
    }
    router.with_state(state)
}

/// Build the full router once at startup.
pub fn gateway_routes(state: AppState) -> Router {
    let body_limit = state.config.max_body_bytes;
    Router::new()
        .merge(fixed_routes(state.clone()))
        .merge(table_routes(state.clone()))
        .layer(axum::middleware::from_fn_with_state(state, middleware::track))
        .layer(axum::middleware::from_fn(middleware::request_id))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(body_limit))
}
