//! In-memory collaborators for router tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{Method, Request};
use axum::Router;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use table_gateway::adapter::{Adapter, AdapterError, ResultShape};
use table_gateway::context::ExecutionContext;
use table_gateway::migration::{MigrationCommand, MigrationOutcome, MigrationRunner};
use table_gateway::sql::RenderedStatement;
use table_gateway::{gateway_routes, AppState, GatewayConfig, TemplateError, TemplateParams, TemplateRegistry};
use tower::ServiceExt;

#[derive(Clone, Debug)]
pub struct Call {
    pub database: String,
    pub method: Method,
    pub statement: RenderedStatement,
    pub remaining: Duration,
}

/// Renders with the real registry, records every execution, answers with a canned result.
/// Statements that return no rows answer `{"rows_affected": N}` instead.
pub struct RecordingAdapter {
    templates: TemplateRegistry,
    calls: Mutex<Vec<Call>>,
    reply: Mutex<Result<Bytes, String>>,
    affected: Mutex<u64>,
}

impl RecordingAdapter {
    pub fn new() -> Arc<Self> {
        Self::with_templates(TemplateRegistry::builtin())
    }

    pub fn with_templates(templates: TemplateRegistry) -> Arc<Self> {
        Arc::new(RecordingAdapter {
            templates,
            calls: Mutex::new(Vec::new()),
            reply: Mutex::new(Ok(Bytes::from_static(b"[]"))),
            affected: Mutex::new(0),
        })
    }

    pub fn reply_with(&self, body: &'static str) {
        *self.reply.lock().unwrap() = Ok(Bytes::from_static(body.as_bytes()));
    }

    pub fn affect(&self, rows: u64) {
        *self.affected.lock().unwrap() = rows;
    }

    pub fn fail_with(&self, message: &str) {
        *self.reply.lock().unwrap() = Err(message.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Adapter for RecordingAdapter {
    fn parse_script(&self, name: &str, params: &TemplateParams) -> Result<RenderedStatement, TemplateError> {
        self.templates.render(name, params)
    }

    async fn execute(
        &self,
        ctx: &ExecutionContext,
        method: &Method,
        stmt: &RenderedStatement,
    ) -> Result<Bytes, AdapterError> {
        self.calls.lock().unwrap().push(Call {
            database: ctx.database().to_string(),
            method: method.clone(),
            statement: stmt.clone(),
            remaining: ctx.remaining(),
        });
        let reply = self.reply.lock().unwrap().clone().map_err(AdapterError::Other)?;
        match ResultShape::of(&stmt.sql) {
            ResultShape::Rows => Ok(reply),
            ResultShape::RowsAffected => {
                let rows = *self.affected.lock().unwrap();
                Ok(Bytes::from(format!(r#"{{"rows_affected":{}}}"#, rows)))
            }
        }
    }
}

/// Returns a fixed outcome and remembers the commands it was given.
pub struct StubMigrator {
    pub outcome: MigrationOutcome,
    pub commands: Mutex<Vec<MigrationCommand>>,
}

impl StubMigrator {
    pub fn new(outcome: MigrationOutcome) -> Arc<Self> {
        Arc::new(StubMigrator {
            outcome,
            commands: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl MigrationRunner for StubMigrator {
    async fn run(&self, command: MigrationCommand) -> MigrationOutcome {
        self.commands.lock().unwrap().push(command);
        self.outcome.clone()
    }
}

pub fn config() -> GatewayConfig {
    GatewayConfig::new("postgres://localhost/iot", "iot")
}

pub fn state(config: GatewayConfig, adapter: Arc<RecordingAdapter>) -> AppState {
    AppState::new(config, adapter, StubMigrator::new(MigrationOutcome::default())).unwrap()
}

pub fn router(adapter: Arc<RecordingAdapter>) -> Router {
    gateway_routes(state(config(), adapter))
}

pub async fn send(app: Router, method: Method, uri: &str, body: &str) -> (u16, String) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    let status = res.status().as_u16();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}
