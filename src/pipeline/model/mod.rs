//! Hosted generative model: request types, error taxonomy and the
//! `GenerativeModel` seam the extraction pipelines are written against.

pub mod gemini;
pub mod mock;

pub use gemini::GeminiClient;
pub use mock::MockModel;

use futures_util::future::BoxFuture;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model endpoint unreachable at {0}")]
    Connection(String),

    #[error("Model request timed out after {0}s")]
    Timeout(u64),

    #[error("Model returned error (status {status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("Model returned no candidates (block reason: {block_reason:?})")]
    EmptyResponse { block_reason: Option<String> },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}

/// An image sent inline with the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    /// Base64 payload exactly as received from the caller.
    pub data_base64: String,
}

/// One single-turn generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRequest {
    pub prompt: String,
    pub image: Option<InlineImage>,
}

impl ModelRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            image: None,
        }
    }

    pub fn with_image(prompt: impl Into<String>, image: InlineImage) -> Self {
        Self {
            prompt: prompt.into(),
            image: Some(image),
        }
    }
}

/// A text/image-to-text model. Called once per request, no streaming.
pub trait GenerativeModel: Send + Sync {
    fn generate<'a>(&'a self, request: &'a ModelRequest) -> BoxFuture<'a, Result<String, ModelError>>;

    /// Model identifier, for logs.
    fn model_name(&self) -> &str;
}
