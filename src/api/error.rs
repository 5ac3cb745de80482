//! API error type and its JSON response mapping.
//!
//! Every failure is answered with `{"error": <message>, "code": <CODE>}`.
//! Configuration and upstream details stay in the logs; callers get a
//! fixed message per class.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::config::ConfigError;
use crate::db::StoreError;
use crate::pipeline::PipelineError;

pub const DUPLICATE_MESSAGE: &str = "Duplicate: This record already exists.";

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Configuration missing: {0}")]
    Config(ConfigError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Upstream failure: {0}")]
    Upstream(String),

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Duplicate: This record already exists.")]
    Duplicate,
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Config(_) => "CONFIG_MISSING",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Upstream(_) => "UPSTREAM_FAILURE",
            ApiError::MalformedResponse(_) => "MALFORMED_RESPONSE",
            ApiError::Duplicate => "DUPLICATE",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Duplicate => StatusCode::CONFLICT,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::Config(e) => {
                tracing::error!(error = %e, "Request needs an unconfigured collaborator");
                "Server configuration is incomplete".to_string()
            }
            ApiError::BadRequest(detail) => detail.clone(),
            ApiError::Upstream(detail) => {
                tracing::error!(detail, "Upstream call failed");
                "Upstream service request failed".to_string()
            }
            ApiError::MalformedResponse(detail) => {
                tracing::warn!(detail, "Model response rejected");
                "AI response could not be interpreted".to_string()
            }
            ApiError::Duplicate => DUPLICATE_MESSAGE.to_string(),
        };

        let body = ErrorBody {
            error: message,
            code: self.code(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::Config(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Extraction(e) if e.is_caller_error() => ApiError::BadRequest(e.to_string()),
            PipelineError::Extraction(e) => ApiError::MalformedResponse(e.to_string()),
            PipelineError::Store(StoreError::Duplicate) => ApiError::Duplicate,
            PipelineError::Store(e) => ApiError::Upstream(e.to_string()),
            PipelineError::Model(e) => ApiError::Upstream(e.to_string()),
            PipelineError::Push(e) => ApiError::Upstream(e.to_string()),
        }
    }
}
