//! Table gateway: PostgreSQL tables over REST, with templated upserts.
//!
//! Upserts call the `gateway_upsert` SQL function from `migrations/0001_gateway_upsert.up.sql`.
//! Run `apply_pending` (or `GET /migrations/up`) against each served database before upserting.

pub mod adapter;
pub mod auth;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod migration;
pub mod plugins;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod template;

pub use adapter::{Adapter, AdapterError, PgAdapter, ResultShape};
pub use config::{CacheConfig, GatewayConfig};
pub use context::{ExecutionContext, RequestTimeout, TimeoutOverride};
pub use error::{AppError, ConfigError, TemplateError};
pub use migration::{apply_pending, MigrationCommand, MigrationOutcome, MigrationRunner, PgMigrator};
pub use plugins::{ExtensionHandler, ExtensionRegistry, Intercept, RequestInterceptor};
pub use routes::gateway_routes;
pub use state::AppState;
pub use template::{ScriptTemplate, TemplateParams, TemplateRegistry, TemplateValue};
