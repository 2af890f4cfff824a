//! Error types for inference calls.

use thiserror::Error;

/// Result type for inference calls.
pub type InferenceResult<T> = Result<T, InferenceError>;

/// Errors that can occur while talking to the inference endpoint.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Gemini AI integration not configured")]
    NotConfigured,

    #[error("Gemini API request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-success HTTP status, with the upstream body preserved.
    #[error("Gemini API error: {status} {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse Gemini response: {0}")]
    Parse(String),

    #[error("Gemini request timed out after {0} seconds")]
    Timeout(u64),
}

impl InferenceError {
    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Upstream HTTP status, when the endpoint answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
