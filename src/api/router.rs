//! Function router.
//!
//! Every function is served at `/<name>` and again under `/functions/v1/`
//! so clients built against the hosted functions path work unchanged.
//!
//! Layers (outermost → innermost): CORS → access log → OPTIONS answer →
//! body limit → handler.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderName, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Largest accepted request body. Base64 inflates a 10 MiB image to ~13.4 MiB.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Path prefix used by the client SDK to invoke functions.
pub const FUNCTIONS_PREFIX: &str = "/functions/v1";

pub fn relay_router(ctx: ApiContext) -> Router {
    let functions = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/analyze-report", post(endpoints::reports::analyze))
        .route("/process-medical-report", post(endpoints::reports::process))
        .route("/triage-symptoms", post(endpoints::triage::triage))
        .route("/notify-donors", post(endpoints::donors::notify))
        .route("/extract-blood-request", post(endpoints::blood_requests::extract))
        .with_state(ctx);

    Router::new()
        .merge(functions.clone())
        .nest(FUNCTIONS_PREFIX, functions)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(axum::middleware::from_fn(middleware::access_log::answer_options))
        .layer(axum::middleware::from_fn(middleware::access_log::log_access))
        .layer(cors_layer())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            header::CONTENT_TYPE,
        ])
}
