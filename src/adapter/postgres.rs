//! PostgreSQL adapter: a bounded set of lazily created pools, one per logical database, and
//! templates from a fixed registry.

use crate::adapter::{json_rows_sql, Adapter, AdapterError, ResultShape};
use crate::config::GatewayConfig;
use crate::context::ExecutionContext;
use crate::error::{AppError, TemplateError};
use crate::sql::RenderedStatement;
use crate::template::{TemplateParams, TemplateRegistry};
use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::Method;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use serde_json::json;
use sqlx::PgPool;
use std::collections::{HashMap, VecDeque};
use std::str::FromStr;
use std::sync::RwLock;

pub struct PgAdapter {
    base: PgConnectOptions,
    default_database: String,
    max_connections: u32,
    templates: TemplateRegistry,
    pools: RwLock<PoolSet>,
}

/// Open pools by database, with the order they were opened in. Never holds more than `max` pools.
struct PoolSet {
    max: usize,
    pools: HashMap<String, PgPool>,
    opened: VecDeque<String>,
}

impl PoolSet {
    fn new(max: usize, database: String, pool: PgPool) -> Self {
        let mut pools = HashMap::new();
        pools.insert(database, pool);
        PoolSet {
            max,
            pools,
            opened: VecDeque::new(),
        }
    }

    /// Cache `pool` for `database`, closing the oldest other pool when full. Returns false when
    /// there is nothing to evict and the pool stays uncached.
    fn insert(&mut self, database: &str, pool: PgPool) -> bool {
        if self.pools.len() >= self.max {
            let Some(oldest) = self.opened.pop_front() else {
                return false;
            };
            tracing::info!(database = %oldest, "closing pool");
            self.pools.remove(&oldest);
        }
        self.opened.push_back(database.to_string());
        self.pools.insert(database.to_string(), pool);
        true
    }

    fn remove(&mut self, database: &str) {
        if self.opened.iter().any(|d| d == database) {
            self.opened.retain(|d| d != database);
            self.pools.remove(database);
        }
    }
}

impl PgAdapter {
    /// Connect the configured database eagerly; other databases get a pool on first use.
    pub async fn connect(config: &GatewayConfig, templates: TemplateRegistry) -> Result<Self, AppError> {
        let base = PgConnectOptions::from_str(&config.database_url)?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(base.clone().database(&config.database))
            .await?;
        tracing::info!(database = %config.database, "connected");
        Ok(Self::with_pool(config, base, templates, pool))
    }

    fn with_pool(config: &GatewayConfig, base: PgConnectOptions, templates: TemplateRegistry, pool: PgPool) -> Self {
        PgAdapter {
            base,
            default_database: config.database.clone(),
            max_connections: config.max_connections,
            templates,
            pools: RwLock::new(PoolSet::new(config.max_pools, config.database.clone(), pool)),
        }
    }

    /// Pool for the configured database (used by the migration runner).
    pub fn default_pool(&self) -> Result<PgPool, AdapterError> {
        self.pool_for(&self.default_database)
    }

    fn pool_for(&self, database: &str) -> Result<PgPool, AdapterError> {
        {
            let set = self
                .pools
                .read()
                .map_err(|_| AdapterError::Other("pool registry lock poisoned".into()))?;
            if let Some(pool) = set.pools.get(database) {
                return Ok(pool.clone());
            }
        }
        let mut set = self
            .pools
            .write()
            .map_err(|_| AdapterError::Other("pool registry lock poisoned".into()))?;
        if let Some(pool) = set.pools.get(database) {
            return Ok(pool.clone());
        }
        tracing::info!(database = %database, "opening pool");
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .connect_lazy_with(self.base.clone().database(database));
        if !set.insert(database, pool.clone()) {
            tracing::warn!(database = %database, max = set.max, "pool limit reached, using an uncached pool");
        }
        Ok(pool)
    }

    /// Drop the cached pool of a database that no longer exists. The configured database keeps its pool.
    fn forget_missing(&self, database: &str, err: &sqlx::Error) {
        let missing = matches!(err, sqlx::Error::Database(e) if e.code().as_deref() == Some(UNDEFINED_DATABASE));
        if !missing {
            return;
        }
        if let Ok(mut set) = self.pools.write() {
            set.remove(database);
        }
    }
}

const UNDEFINED_DATABASE: &str = "3D000";

#[async_trait]
impl Adapter for PgAdapter {
    fn parse_script(&self, name: &str, params: &TemplateParams) -> Result<RenderedStatement, TemplateError> {
        self.templates.render(name, params)
    }

    async fn execute(
        &self,
        ctx: &ExecutionContext,
        method: &Method,
        stmt: &RenderedStatement,
    ) -> Result<Bytes, AdapterError> {
        let pool = self.pool_for(ctx.database())?;
        tracing::debug!(database = %ctx.database(), source = %stmt.source, sql = %stmt.inline_sql(), "execute");
        let result = match ResultShape::of(&stmt.sql) {
            ResultShape::Rows => {
                let sql = json_rows_sql(method, &stmt.sql);
                let mut query = sqlx::query_scalar::<_, String>(&sql);
                for p in &stmt.params {
                    query = query.bind(p.clone());
                }
                ctx.run(query.fetch_one(&pool)).await?.map(Bytes::from)
            }
            ResultShape::RowsAffected => {
                let mut query = sqlx::query(&stmt.sql);
                for p in &stmt.params {
                    query = query.bind(p.clone());
                }
                ctx.run(query.execute(&pool))
                    .await?
                    .map(|done| Bytes::from(json!({ "rows_affected": done.rows_affected() }).to_string()))
            }
        };
        result.map_err(|e| {
            self.forget_missing(ctx.database(), &e);
            AdapterError::Db(e)
        })
    }
}
