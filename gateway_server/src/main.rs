//! Gateway server: config from the environment, one adapter and migrator, pending migrations, then serve.
//!
//! Run from repo root: `cargo run -p gateway-server`

use std::sync::Arc;
use table_gateway::{apply_pending, gateway_routes, AppState, GatewayConfig, PgAdapter, PgMigrator, TemplateRegistry};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let config = GatewayConfig::from_env()?;

    let default_directive = if config.debug { "table_gateway=debug" } else { "table_gateway=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)))
        .init();

    let templates = TemplateRegistry::builtin().load_dir(&config.queries_path)?;
    let adapter = PgAdapter::connect(&config, templates).await?;
    let migrator = PgMigrator::new(adapter.default_pool()?, config.migrations_path.clone());
    let applied = apply_pending(&migrator).await?;
    tracing::info!(applied = applied.len(), "migrations up to date");

    let bind = config.bind.clone();
    let state = AppState::new(config, Arc::new(adapter), Arc::new(migrator))?;
    let _liveness = state.metrics.spawn_liveness();
    let app = gateway_routes(state);

    let listener = TcpListener::bind(&bind).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;
    Ok(())
}
