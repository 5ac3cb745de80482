//! Turning free-form model output into typed, validated records.
//!
//! The model is asked for JSON but answers with text: sometimes fenced in
//! Markdown, sometimes with prose around it, sometimes with fields missing
//! or of the wrong type. `response` recovers the JSON value, `validation`
//! checks it field by field and applies the documented defaults.

pub mod image;
pub mod prompt;
pub mod response;
pub mod sanitize;
pub mod types;
pub mod validation;

pub use image::*;
pub use response::*;
pub use sanitize::*;
pub use types::*;
pub use validation::*;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Model output is not valid JSON: {0}")]
    MalformedResponse(String),

    #[error("Model output is not a JSON object")]
    NotAnObject,

    #[error("Model output is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("Model output field `{field}` is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Invalid image payload: {0}")]
    InvalidImage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ExtractionError {
    /// True when the caller's payload was at fault rather than the model.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::InvalidImage(_) | Self::InvalidInput(_))
    }
}
