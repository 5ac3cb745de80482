//! Request logging.
//!
//! Logs method, path, status and latency for every request. Bodies are
//! never logged: they carry documents and health information.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

pub async fn log_access(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    let status = response.status().as_u16();
    let elapsed_ms = start.elapsed().as_millis() as u64;
    if response.status().is_server_error() {
        tracing::error!(%method, path = %path, status, elapsed_ms, "Request failed");
    } else {
        tracing::info!(%method, path = %path, status, elapsed_ms, "Request handled");
    }
    response
}

/// Answer any `OPTIONS` request with a bare 200. CORS pre-flights carrying
/// `Access-Control-Request-Method` are answered by the CORS layer before
/// reaching this point.
pub async fn answer_options(req: Request<Body>, next: Next) -> Response {
    if req.method() == Method::OPTIONS {
        return (StatusCode::OK, "ok").into_response();
    }
    next.run(req).await
}
