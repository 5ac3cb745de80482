use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::blood_request::extract_blood_request;
use crate::pipeline::extraction::BloodRequestDraft;

#[derive(Deserialize)]
pub struct ExtractBloodRequest {
    pub text: String,
}

/// `POST /extract-blood-request`: prefill the request form from free text.
pub async fn extract(
    State(ctx): State<ApiContext>,
    payload: Result<Json<ExtractBloodRequest>, JsonRejection>,
) -> Result<Json<BloodRequestDraft>, ApiError> {
    let model = ctx.model()?;
    let Json(req) = payload?;
    let draft = extract_blood_request(model.as_ref(), &req.text).await?;
    Ok(Json(draft))
}
