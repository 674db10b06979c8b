mod common;

use async_trait::async_trait;
use axum::extract::Request;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use common::{config, router, send, state, RecordingAdapter, StubMigrator};
use std::time::Duration;
use table_gateway::adapter::ResultShape;
use table_gateway::migration::{MigrationCommand, MigrationOutcome};
use table_gateway::plugins::{ExtensionHandler, ExtensionRegistry, Intercept, RequestInterceptor};
use table_gateway::{gateway_routes, AppState, TemplateRegistry, TimeoutOverride};

#[tokio::test]
async fn health_is_plain_ok() {
    let (status, body) = send(router(RecordingAdapter::new()), Method::GET, "/health", "").await;
    assert_eq!(status, 200);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    use tower::ServiceExt;
    let req = axum::http::Request::builder()
        .uri("/health")
        .body(axum::body::Body::empty())
        .unwrap();
    let res = router(RecordingAdapter::new()).oneshot(req).await.unwrap();
    assert!(res.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn metrics_count_requests() {
    let app = router(RecordingAdapter::new());
    send(app.clone(), Method::GET, "/health", "").await;
    let (status, body) = send(app, Method::GET, "/metrics", "").await;
    assert_eq!(status, 200);
    assert!(body.contains(r#"gateway_http_requests_total{method="GET",status="200"}"#));
}

fn with_migrator(outcome: MigrationOutcome) -> (axum::Router, std::sync::Arc<StubMigrator>) {
    let migrator = StubMigrator::new(outcome);
    let state = AppState::new(config(), RecordingAdapter::new(), migrator.clone()).unwrap();
    (gateway_routes(state), migrator)
}

#[tokio::test]
async fn migrations_report_executed_ids() {
    let (app, migrator) = with_migrator(MigrationOutcome {
        executed: vec!["0001_gateway_upsert".into(), "0002_devices".into()],
        error: None,
    });
    let (status, body) = send(app, Method::GET, "/migrations/up?n=2", "").await;
    assert_eq!(status, 200);
    assert_eq!(body, " ok \n0001_gateway_upsert\n0002_devices\n");
    assert_eq!(*migrator.commands.lock().unwrap(), vec![MigrationCommand::Up(Some(2))]);
}

#[tokio::test]
async fn failed_migration_still_lists_what_ran() {
    let (app, _) = with_migrator(MigrationOutcome {
        executed: vec!["0001_gateway_upsert".into()],
        error: Some("0002_devices: syntax error".into()),
    });
    let (status, body) = send(app, Method::GET, "/migrations/up", "").await;
    assert_eq!(status, 500);
    assert_eq!(body, "run migration error 0002_devices: syntax error\n0001_gateway_upsert\n");
}

#[tokio::test]
async fn unknown_migration_verb_is_a_server_error() {
    let (app, migrator) = with_migrator(MigrationOutcome::default());
    let (status, body) = send(app, Method::GET, "/migrations/sideways", "").await;
    assert_eq!(status, 500);
    assert!(body.starts_with("run migration error"));
    assert!(migrator.commands.lock().unwrap().is_empty());
}

#[tokio::test]
async fn scripts_resolve_by_method_and_bind_query_params() {
    let mut templates = TemplateRegistry::builtin();
    templates.insert("reports/by_owner.read.sql", "SELECT * FROM devices WHERE owner = {{.owner}}");
    let adapter = RecordingAdapter::with_templates(templates);
    adapter.reply_with(r#"[{"id":3}]"#);
    let (status, body) = send(router(adapter.clone()), Method::GET, "/_QUERIES/reports/by_owner?owner=ann", "").await;
    assert_eq!(status, 200);
    assert_eq!(body, r#"[{"id":3}]"#);
    let call = &adapter.calls()[0];
    assert_eq!(call.statement.sql, "SELECT * FROM devices WHERE owner = $1");
    assert_eq!(call.database, "iot");

    let (status, _) = send(router(adapter.clone()), Method::POST, "/_QUERIES/reports/by_owner", "").await;
    assert_eq!(status, 404);
    let (status, _) = send(router(adapter), Method::GET, "/_QUERIES/reports/by_owner", "").await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn write_scripts_without_returning_report_rows_affected() {
    let mut templates = TemplateRegistry::builtin();
    templates.insert(
        "maintenance/touch.write.sql",
        "-- mark devices seen\nUPDATE devices SET seen_at = now() WHERE owner = {{.owner}};\n",
    );
    let adapter = RecordingAdapter::with_templates(templates);
    adapter.affect(3);
    let (status, body) = send(
        router(adapter.clone()),
        Method::POST,
        "/_QUERIES/maintenance/touch?owner=ann",
        "",
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body, r#"{"rows_affected":3}"#);
    let call = &adapter.calls()[0];
    assert_eq!(ResultShape::of(&call.statement.sql), ResultShape::RowsAffected);
    assert_eq!(call.method, Method::POST);
}

#[tokio::test]
async fn table_select_builds_a_filtered_query() {
    let adapter = RecordingAdapter::new();
    adapter.reply_with(r#"[{"id":1}]"#);
    let (status, body) = send(
        router(adapter.clone()),
        Method::GET,
        "/iot/public/devices?_select=id&status=on&_page_size=5",
        "",
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body, r#"[{"id":1}]"#);
    let call = &adapter.calls()[0];
    assert_eq!(call.method, Method::GET);
    assert!(call.statement.sql.starts_with(r#"SELECT "id" FROM "public"."devices" WHERE "status"::text = $1"#));
}

#[tokio::test]
async fn table_routes_enforce_the_configured_database() {
    let adapter = RecordingAdapter::new();
    for (method, uri) in [
        (Method::GET, "/other/public/devices"),
        (Method::POST, "/other/public/devices"),
        (Method::POST, "/batch/other/public/devices"),
        (Method::PATCH, "/other/public/devices?id=1"),
        (Method::DELETE, "/other/public/devices?id=1"),
    ] {
        let (status, _) = send(router(adapter.clone()), method, uri, r#"{"id":1}"#).await;
        assert_eq!(status, 400, "{}", uri);
    }
    assert!(adapter.calls().is_empty());
}

#[tokio::test]
async fn batch_insert_requires_a_non_empty_array() {
    let adapter = RecordingAdapter::new();
    let (status, _) = send(router(adapter.clone()), Method::POST, "/batch/iot/public/devices", "[]").await;
    assert_eq!(status, 400);
    let (status, _) = send(router(adapter.clone()), Method::POST, "/batch/iot/public/devices", r#"[{"id":1}]"#).await;
    assert_eq!(status, 200);
    assert_eq!(adapter.calls().len(), 1);
}

#[tokio::test]
async fn cache_serves_repeated_gets_but_not_writes() {
    let adapter = RecordingAdapter::new();
    adapter.reply_with(r#"[{"id":1}]"#);
    let mut cfg = config();
    cfg.cache.enabled = true;
    let app = gateway_routes(state(cfg, adapter.clone()));

    let first = send(app.clone(), Method::GET, "/iot/public/devices", "").await;
    let second = send(app.clone(), Method::GET, "/iot/public/devices", "").await;
    assert_eq!(first, second);
    assert_eq!(adapter.calls().len(), 1);

    send(app.clone(), Method::POST, "/iot/public/devices", r#"{"id":2}"#).await;
    send(app, Method::POST, "/iot/public/devices", r#"{"id":2}"#).await;
    assert_eq!(adapter.calls().len(), 3);
}

struct Block;

#[async_trait]
impl RequestInterceptor for Block {
    async fn intercept(&self, req: &mut Request) -> Intercept {
        if req.headers().contains_key("x-block") {
            Intercept::Respond((StatusCode::FORBIDDEN, "blocked").into_response())
        } else {
            Intercept::Continue
        }
    }
}

struct ShortTimeout;

#[async_trait]
impl RequestInterceptor for ShortTimeout {
    async fn intercept(&self, req: &mut Request) -> Intercept {
        req.extensions_mut().insert(TimeoutOverride(2));
        Intercept::Continue
    }
}

#[tokio::test]
async fn interceptors_can_answer_or_override_the_timeout() {
    use tower::ServiceExt;
    let adapter = RecordingAdapter::new();
    let extensions = ExtensionRegistry::new().with_interceptor(Block).with_interceptor(ShortTimeout);
    let app = gateway_routes(state(config(), adapter.clone()).with_extensions(extensions));

    let req = axum::http::Request::builder()
        .method(Method::GET)
        .uri("/iot/public/devices")
        .header("x-block", "1")
        .body(axum::body::Body::empty())
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert!(adapter.calls().is_empty());

    let (status, _) = send(app, Method::POST, "/upsert/iot/public/devices?keys=id", r#"{"id":1}"#).await;
    assert_eq!(status, 200);
    let remaining = adapter.calls()[0].remaining;
    assert!(remaining <= Duration::from_secs(2));
    assert!(remaining > Duration::ZERO);
}

struct Hello;

#[async_trait]
impl ExtensionHandler for Hello {
    async fn call(&self, _req: Request) -> Response {
        (StatusCode::OK, "hello").into_response()
    }
}

#[tokio::test]
async fn plugins_dispatch_by_file_and_func() {
    let extensions = ExtensionRegistry::new().with_handler("greet", "hello", Hello);
    let app = gateway_routes(state(config(), RecordingAdapter::new()).with_extensions(extensions));
    let (status, body) = send(app.clone(), Method::GET, "/_PLUGIN/greet/hello", "").await;
    assert_eq!((status, body.as_str()), (200, "hello"));
    let (status, _) = send(app, Method::GET, "/_PLUGIN/greet/missing", "").await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn auth_route_exists_only_when_enabled() {
    let creds = r#"{"username":"u","password":"p"}"#;
    let (status, _) = send(router(RecordingAdapter::new()), Method::POST, "/auth", creds).await;
    assert_eq!(status, 404);

    let mut cfg = config();
    cfg.auth_enabled = true;
    let app = gateway_routes(state(cfg, RecordingAdapter::new()));
    let (status, _) = send(app, Method::POST, "/auth", creds).await;
    assert_eq!(status, 501);
}
