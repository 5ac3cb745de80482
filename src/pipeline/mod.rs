//! Request pipelines: model call, response normalization, persistence or
//! push fan-out.
//!
//! Every operation takes its collaborators as trait objects so the HTTP
//! layer can hand in real clients and tests can hand in mocks.

pub mod blood_request;
pub mod donors;
pub mod extraction;
pub mod model;
pub mod report;
pub mod triage;

use thiserror::Error;

use crate::db::StoreError;
use crate::notify::PushError;
use extraction::ExtractionError;
use model::ModelError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Model call failed: {0}")]
    Model(#[from] ModelError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Push error: {0}")]
    Push(#[from] PushError),
}

/// Run one model call and recover the JSON value from its text answer.
pub(crate) async fn generate_json(
    model: &dyn model::GenerativeModel,
    request: &model::ModelRequest,
) -> Result<serde_json::Value, PipelineError> {
    let start = std::time::Instant::now();
    let text = model.generate(request).await?;
    let value = extraction::parse_model_json(&text)?;
    tracing::debug!(
        model = model.model_name(),
        elapsed_ms = %start.elapsed().as_millis(),
        "Model output parsed"
    );
    Ok(value)
}
