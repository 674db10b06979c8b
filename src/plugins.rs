//! Statically compiled extensions: named handlers served at `/_PLUGIN/{file}/{func}` and
//! request interceptors run in front of the table routes.

use async_trait::async_trait;
use axum::extract::Request;
use axum::response::Response;
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait]
pub trait ExtensionHandler: Send + Sync {
    async fn call(&self, req: Request) -> Response;
}

pub enum Intercept {
    /// Pass the (possibly modified) request on.
    Continue,
    /// Answer without reaching the handler.
    Respond(Response),
}

#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    /// May insert extensions such as `TimeoutOverride` before returning `Continue`.
    async fn intercept(&self, req: &mut Request) -> Intercept;
}

/// Built once at startup, read-only afterwards.
#[derive(Clone, Default)]
pub struct ExtensionRegistry {
    handlers: HashMap<(String, String), Arc<dyn ExtensionHandler>>,
    interceptors: Vec<Arc<dyn RequestInterceptor>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handler(
        mut self,
        file: impl Into<String>,
        func: impl Into<String>,
        handler: impl ExtensionHandler + 'static,
    ) -> Self {
        self.handlers.insert((file.into(), func.into()), Arc::new(handler));
        self
    }

    /// Interceptors run in registration order.
    pub fn with_interceptor(mut self, interceptor: impl RequestInterceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn handler(&self, file: &str, func: &str) -> Option<Arc<dyn ExtensionHandler>> {
        self.handlers.get(&(file.to_string(), func.to_string())).cloned()
    }

    pub fn interceptors(&self) -> &[Arc<dyn RequestInterceptor>] {
        &self.interceptors
    }

    pub fn has_interceptors(&self) -> bool {
        !self.interceptors.is_empty()
    }
}
