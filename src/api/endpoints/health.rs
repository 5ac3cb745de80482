use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::types::ApiContext;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub model_configured: bool,
    pub store_configured: bool,
    pub push_configured: bool,
}

/// `GET /health`: liveness plus which collaborators are wired up.
pub async fn check(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
        model_configured: ctx.model_configured(),
        store_configured: ctx.store_configured(),
        push_configured: ctx.push_configured(),
    })
}
