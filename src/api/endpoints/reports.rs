//! Report endpoints.
//!
//! - `POST /analyze-report`: read a document image, return the extraction
//! - `POST /process-medical-report`: same, then store it as a medical event

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::extraction::ExtractionResult;
use crate::pipeline::report::{self, ReportImage, ReportOwner};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeReportRequest {
    pub image_base64: String,
    pub mime_type: Option<String>,
}

#[derive(Deserialize)]
pub struct ProcessReportRequest {
    #[serde(rename = "imageBase64")]
    pub image_base64: String,
    #[serde(rename = "mimeType")]
    pub mime_type: Option<String>,
    pub patient_id: String,
    pub uploader_id: String,
    pub file_url: String,
}

/// `data` is the extraction as analyzed; `event_id` names the stored row.
#[derive(Serialize)]
pub struct ProcessReportResponse {
    pub success: bool,
    pub event_id: Uuid,
    pub data: ExtractionResult,
}

fn today() -> chrono::NaiveDate {
    chrono::Utc::now().date_naive()
}

pub async fn analyze(
    State(ctx): State<ApiContext>,
    payload: Result<Json<AnalyzeReportRequest>, JsonRejection>,
) -> Result<Json<ExtractionResult>, ApiError> {
    let model = ctx.model()?;
    let Json(req) = payload?;

    let image = ReportImage {
        image_base64: &req.image_base64,
        mime_type: req.mime_type.as_deref(),
    };
    let result = report::analyze_report(model.as_ref(), &image, today()).await?;
    Ok(Json(result))
}

pub async fn process(
    State(ctx): State<ApiContext>,
    payload: Result<Json<ProcessReportRequest>, JsonRejection>,
) -> Result<Json<ProcessReportResponse>, ApiError> {
    let model = ctx.model()?;
    let events = ctx.events()?;
    let Json(req) = payload?;

    let image = ReportImage {
        image_base64: &req.image_base64,
        mime_type: req.mime_type.as_deref(),
    };
    let owner = ReportOwner {
        patient_id: &req.patient_id,
        uploader_id: &req.uploader_id,
        file_url: &req.file_url,
    };
    let processed =
        report::process_report(model.as_ref(), events.as_ref(), &image, &owner, today()).await?;

    Ok(Json(ProcessReportResponse {
        success: true,
        event_id: processed.record.id,
        data: processed.extraction,
    }))
}
