//! Request middleware. Table routes run cache → plugin → timeout before the handler;
//! request id and metrics wrap the whole router.

use crate::cache::CachedResponse;
use crate::context::{RequestTimeout, TimeoutOverride};
use crate::error::AppError;
use crate::plugins::Intercept;
use crate::state::AppState;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::Instrument;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Serve GETs from the response cache; store successful GET responses. Writes pass through untouched.
pub async fn cache(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(cache) = state.cache.clone() else {
        return next.run(req).await;
    };
    if req.method() != Method::GET {
        return next.run(req).await;
    }
    let key = req.uri().to_string();
    if let Some(hit) = cache.get(&key) {
        tracing::debug!(key = %key, "cache hit");
        return cached_response(hit);
    }
    let res = next.run(req).await;
    if res.status() != StatusCode::OK {
        return res;
    }
    let (parts, body) = res.into_parts();
    let body = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(b) => b,
        Err(e) => return AppError::Internal(format!("buffer response: {}", e)).into_response(),
    };
    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    cache.insert(
        key,
        CachedResponse {
            content_type,
            body: body.clone(),
        },
    );
    Response::from_parts(parts, Body::from(body))
}

fn cached_response(hit: CachedResponse) -> Response {
    let mut res = Response::new(Body::from(hit.body));
    if let Some(ct) = hit.content_type.and_then(|ct| HeaderValue::from_str(&ct).ok()) {
        res.headers_mut().insert(header::CONTENT_TYPE, ct);
    }
    res
}

/// Run registered interceptors in order; any of them may answer the request.
pub async fn plugin(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    for interceptor in state.extensions.interceptors() {
        if let Intercept::Respond(res) = interceptor.intercept(&mut req).await {
            return res;
        }
    }
    next.run(req).await
}

/// Attach the per-request timeout, honouring an interceptor's `TimeoutOverride`.
pub async fn timeout(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let secs = req
        .extensions()
        .get::<TimeoutOverride>()
        .map(|o| o.0)
        .unwrap_or(state.config.http_timeout_secs);
    req.extensions_mut().insert(RequestTimeout(secs));
    next.run(req).await
}

pub async fn request_id(req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let span = tracing::info_span!("request", id = %id, method = %req.method(), path = %req.uri().path());
    let mut res = next.run(req).instrument(span).await;
    if let Ok(v) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, v);
    }
    res
}

pub async fn track(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let res = next.run(req).await;
    state.metrics.record_request(method.as_str(), res.status().as_u16());
    res
}
