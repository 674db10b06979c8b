//! Prometheus metrics: request and upsert counters, plus the liveness gauge.

use crate::error::AppError;
use prometheus::{Encoder, Gauge, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Duration;
use tokio::task::JoinHandle;

pub const LIVENESS_INTERVAL: Duration = Duration::from_secs(15);

fn internal(e: prometheus::Error) -> AppError {
    AppError::Internal(format!("metrics: {}", e))
}

#[derive(Clone)]
pub struct GatewayMetrics {
    registry: Registry,
    requests: IntCounterVec,
    upserts: IntCounterVec,
    live: Gauge,
}

impl GatewayMetrics {
    pub fn new() -> Result<Self, AppError> {
        let registry = Registry::new();
        let requests = IntCounterVec::new(
            Opts::new("gateway_http_requests_total", "HTTP requests served, by method and status"),
            &["method", "status"],
        )
        .map_err(internal)?;
        let upserts = IntCounterVec::new(
            Opts::new("gateway_upserts_total", "Upsert pipeline runs, by mode and outcome"),
            &["mode", "outcome"],
        )
        .map_err(internal)?;
        let live = Gauge::with_opts(
            Opts::new("live", "Set to 1 while the service is running")
                .namespace("iot")
                .subsystem("service"),
        )
        .map_err(internal)?;
        registry.register(Box::new(requests.clone())).map_err(internal)?;
        registry.register(Box::new(upserts.clone())).map_err(internal)?;
        registry.register(Box::new(live.clone())).map_err(internal)?;
        Ok(GatewayMetrics { registry, requests, upserts, live })
    }

    pub fn record_request(&self, method: &str, status: u16) {
        self.requests.with_label_values(&[method, &status.to_string()]).inc();
    }

    /// `mode` is `single` or `batch`; `outcome` is `ok` or `error`.
    pub fn record_upsert(&self, batch: bool, ok: bool) {
        let mode = if batch { "batch" } else { "single" };
        let outcome = if ok { "ok" } else { "error" };
        self.upserts.with_label_values(&[mode, outcome]).inc();
    }

    pub fn mark_live(&self) {
        self.live.set(1.0);
    }

    /// Text exposition format.
    pub fn render(&self) -> Result<String, AppError> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(internal)?;
        String::from_utf8(buffer).map_err(|e| AppError::Internal(e.to_string()))
    }

    /// Refresh the liveness gauge forever on `LIVENESS_INTERVAL`.
    pub fn spawn_liveness(&self) -> JoinHandle<()> {
        let metrics = self.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(LIVENESS_INTERVAL);
            loop {
                tick.tick().await;
                metrics.mark_live();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_exposition() {
        let metrics = GatewayMetrics::new().unwrap();
        metrics.record_request("POST", 200);
        metrics.record_upsert(true, false);
        metrics.mark_live();
        let text = metrics.render().unwrap();
        assert!(text.contains(r#"gateway_http_requests_total{method="POST",status="200"} 1"#));
        assert!(text.contains(r#"gateway_upserts_total{mode="batch",outcome="error"} 1"#));
        assert!(text.contains("iot_service_live 1"));
    }

    #[tokio::test]
    async fn liveness_task_sets_gauge_immediately() {
        let metrics = GatewayMetrics::new().unwrap();
        let handle = metrics.spawn_liveness();
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.abort();
        assert!(metrics.render().unwrap().contains("iot_service_live 1"));
    }
}
