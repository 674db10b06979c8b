//! Load gateway settings from the process environment (or any key lookup).

use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use std::path::PathBuf;
use std::str::FromStr;

impl GatewayConfig {
    /// Read settings from environment variables. Call `dotenvy::dotenv()` first to honor a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from a key lookup; unset keys take their defaults. Validates before returning.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let database = match get("GATEWAY_DATABASE") {
            Some(name) => name,
            None => database_from_url(&database_url).ok_or_else(|| {
                ConfigError::Validation("GATEWAY_DATABASE not set and DATABASE_URL names no database".into())
            })?,
        };

        let mut config = GatewayConfig::new(database_url, database);
        if let Some(v) = get("GATEWAY_SINGLE_DB") {
            config.single_db = parse_bool("GATEWAY_SINGLE_DB", &v)?;
        }
        if let Some(v) = get("GATEWAY_HTTP_TIMEOUT") {
            config.http_timeout_secs = parse_num("GATEWAY_HTTP_TIMEOUT", &v)?;
        }
        if let Some(v) = get("GATEWAY_BIND") {
            config.bind = v;
        }
        if let Some(v) = get("GATEWAY_MIGRATIONS_PATH") {
            config.migrations_path = PathBuf::from(v);
        }
        if let Some(v) = get("GATEWAY_QUERIES_PATH") {
            config.queries_path = PathBuf::from(v);
        }
        if let Some(v) = get("GATEWAY_AUTH_ENABLED") {
            config.auth_enabled = parse_bool("GATEWAY_AUTH_ENABLED", &v)?;
        }
        if let Some(v) = get("GATEWAY_CACHE_ENABLED") {
            config.cache.enabled = parse_bool("GATEWAY_CACHE_ENABLED", &v)?;
        }
        if let Some(v) = get("GATEWAY_CACHE_TIME") {
            config.cache.time_secs = parse_num("GATEWAY_CACHE_TIME", &v)?;
        }
        if let Some(v) = get("GATEWAY_CACHE_MAX_ENTRIES") {
            config.cache.max_entries = parse_num("GATEWAY_CACHE_MAX_ENTRIES", &v)?;
        }
        if let Some(v) = get("GATEWAY_MAX_CONNECTIONS") {
            config.max_connections = parse_num("GATEWAY_MAX_CONNECTIONS", &v)?;
        }
        if let Some(v) = get("GATEWAY_MAX_POOLS") {
            config.max_pools = parse_num("GATEWAY_MAX_POOLS", &v)?;
        }
        if let Some(v) = get("GATEWAY_MAX_BODY_BYTES") {
            config.max_body_bytes = parse_num("GATEWAY_MAX_BODY_BYTES", &v)?;
        }
        if let Some(v) = get("GATEWAY_DEBUG") {
            config.debug = parse_bool("GATEWAY_DEBUG", &v)?;
        }

        validate(&config)?;
        Ok(config)
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}

fn parse_num<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

/// Database component of a postgres URL: `postgres://user@host:5432/name?opts` -> `name`.
pub fn database_from_url(url: &str) -> Option<String> {
    let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
    let path = rest.split_once('/').map(|(_, p)| p)?;
    let name = path.split(&['?', '#'][..]).next().unwrap_or("");
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
