//! Settings validation: values the gateway cannot run with are rejected at startup.

use crate::config::GatewayConfig;
use crate::error::ConfigError;

pub fn validate(config: &GatewayConfig) -> Result<(), ConfigError> {
    if config.database.is_empty() {
        return Err(ConfigError::Validation("database name must not be empty".into()));
    }
    // A zero deadline would expire every adapter call immediately.
    if config.http_timeout_secs == 0 {
        return Err(ConfigError::Validation("GATEWAY_HTTP_TIMEOUT must be greater than 0".into()));
    }
    if config.max_connections == 0 {
        return Err(ConfigError::Validation("GATEWAY_MAX_CONNECTIONS must be greater than 0".into()));
    }
    if config.max_pools == 0 {
        return Err(ConfigError::Validation("GATEWAY_MAX_POOLS must be greater than 0".into()));
    }
    if config.cache.enabled && config.cache.time_secs == 0 {
        return Err(ConfigError::Validation("GATEWAY_CACHE_TIME must be greater than 0 when the cache is enabled".into()));
    }
    if config.bind.parse::<std::net::SocketAddr>().is_err() {
        return Err(ConfigError::InvalidValue {
            key: "GATEWAY_BIND",
            value: config.bind.clone(),
        });
    }
    Ok(())
}
