use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::extraction::TriageResult;
use crate::pipeline::triage::triage_symptoms;

#[derive(Deserialize)]
pub struct TriageRequest {
    pub symptoms: String,
}

/// `POST /triage-symptoms`
pub async fn triage(
    State(ctx): State<ApiContext>,
    payload: Result<Json<TriageRequest>, JsonRejection>,
) -> Result<Json<TriageResult>, ApiError> {
    let model = ctx.model()?;
    let Json(req) = payload?;
    let result = triage_symptoms(model.as_ref(), &req.symptoms).await?;
    Ok(Json(result))
}
