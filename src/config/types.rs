//! Gateway settings. Built once at startup and shared read-only.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_BIND: &str = "0.0.0.0:3000";
pub const DEFAULT_MIGRATIONS_PATH: &str = "./migrations";
pub const DEFAULT_QUERIES_PATH: &str = "./queries";
pub const DEFAULT_CACHE_TIME_SECS: u64 = 10;
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 1024;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_MAX_POOLS: usize = 16;
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Response cache for GET requests on table routes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Entry lifetime in seconds.
    pub time_secs: u64,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            enabled: false,
            time_secs: DEFAULT_CACHE_TIME_SECS,
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.time_secs)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub database_url: String,
    /// Logical database served when `single_db` is on; also the default target for scripts and discovery.
    pub database: String,
    /// Reject table routes whose `{database}` segment differs from `database`.
    pub single_db: bool,
    /// Per-request deadline for adapter calls, in seconds. Never zero.
    pub http_timeout_secs: u64,
    pub bind: String,
    pub migrations_path: PathBuf,
    pub queries_path: PathBuf,
    pub auth_enabled: bool,
    pub cache: CacheConfig,
    pub max_connections: u32,
    /// Upper bound on open per-database pools, the configured database's included.
    pub max_pools: usize,
    pub max_body_bytes: usize,
    pub debug: bool,
}

impl GatewayConfig {
    /// Config with defaults for everything except the connection target.
    pub fn new(database_url: impl Into<String>, database: impl Into<String>) -> Self {
        GatewayConfig {
            database_url: database_url.into(),
            database: database.into(),
            single_db: true,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            bind: DEFAULT_BIND.into(),
            migrations_path: PathBuf::from(DEFAULT_MIGRATIONS_PATH),
            queries_path: PathBuf::from(DEFAULT_QUERIES_PATH),
            auth_enabled: false,
            cache: CacheConfig::default(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            max_pools: DEFAULT_MAX_POOLS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            debug: false,
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Database name the request must target, when single-database mode is on.
    pub fn enforced_database(&self) -> Option<&str> {
        self.single_db.then_some(self.database.as_str())
    }
}
