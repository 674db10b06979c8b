//! Shared application state. Built once at startup and read-only while serving.

use crate::adapter::Adapter;
use crate::auth::Authenticator;
use crate::cache::ResponseCache;
use crate::config::GatewayConfig;
use crate::error::AppError;
use crate::metrics::GatewayMetrics;
use crate::migration::MigrationRunner;
use crate::plugins::ExtensionRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub adapter: Arc<dyn Adapter>,
    pub migrator: Arc<dyn MigrationRunner>,
    pub extensions: Arc<ExtensionRegistry>,
    pub authenticator: Option<Arc<dyn Authenticator>>,
    /// Present only when caching is enabled.
    pub cache: Option<Arc<ResponseCache>>,
    pub metrics: GatewayMetrics,
}

impl AppState {
    pub fn new(
        config: GatewayConfig,
        adapter: Arc<dyn Adapter>,
        migrator: Arc<dyn MigrationRunner>,
    ) -> Result<Self, AppError> {
        let cache = config
            .cache
            .enabled
            .then(|| Arc::new(ResponseCache::from_config(&config.cache)));
        Ok(AppState {
            config: Arc::new(config),
            adapter,
            migrator,
            extensions: Arc::new(ExtensionRegistry::new()),
            authenticator: None,
            cache,
            metrics: GatewayMetrics::new()?,
        })
    }

    pub fn with_extensions(mut self, extensions: ExtensionRegistry) -> Self {
        self.extensions = Arc::new(extensions);
        self
    }

    pub fn with_authenticator(mut self, authenticator: impl Authenticator + 'static) -> Self {
        self.authenticator = Some(Arc::new(authenticator));
        self
    }

    /// Database the request may target, when single-database mode is on.
    pub fn enforced_database(&self) -> Option<&str> {
        self.config.enforced_database()
    }
}
