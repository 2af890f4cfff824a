//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};
use urocase_analysis::AnalysisError;
use urocase_media::MediaError;
use urocase_storage::StorageError;
use urocase_vision::InferenceError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Media(#[from] MediaError),
}

impl From<InferenceError> for ApiError {
    fn from(e: InferenceError) -> Self {
        Self::Analysis(AnalysisError::Inference(e))
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(e: validator::ValidationErrors) -> Self {
        Self::Validation(e.to_string())
    }
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Storage(e) => storage_status(e),
            ApiError::Analysis(e) => analysis_status(e),
            ApiError::Media(e) => media_status(e),
        }
    }

    /// Stable machine-readable code for the client.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not_found",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Validation(_) => "validation_error",
            ApiError::Internal(_) => "internal_error",
            ApiError::Storage(StorageError::NotFound(_) | StorageError::CaseNotFound(_)) => {
                "not_found"
            }
            ApiError::Storage(StorageError::InvalidRange(_)) => "invalid_range",
            ApiError::Storage(_) => "storage_error",
            ApiError::Analysis(AnalysisError::NativeTooLarge { .. }) => "native_too_large",
            ApiError::Analysis(AnalysisError::InvalidImage(_)) => "invalid_image",
            ApiError::Analysis(AnalysisError::Media(e)) | ApiError::Media(e) => media_code(e),
            ApiError::Analysis(AnalysisError::Inference(InferenceError::NotConfigured)) => {
                "inference_not_configured"
            }
            ApiError::Analysis(_) => "analysis_failed",
        }
    }
}

fn storage_status(e: &StorageError) -> StatusCode {
    match e {
        StorageError::NotFound(_) | StorageError::CaseNotFound(_) => StatusCode::NOT_FOUND,
        StorageError::InvalidRange(_) => StatusCode::RANGE_NOT_SATISFIABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn analysis_status(e: &AnalysisError) -> StatusCode {
    match e {
        AnalysisError::NativeTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        AnalysisError::InvalidImage(_) => StatusCode::BAD_REQUEST,
        AnalysisError::Media(e) => media_status(e),
        AnalysisError::Inference(InferenceError::NotConfigured) => StatusCode::SERVICE_UNAVAILABLE,
        AnalysisError::Inference(InferenceError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
        AnalysisError::Inference(_) => StatusCode::BAD_GATEWAY,
        AnalysisError::NativeUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn media_status(e: &MediaError) -> StatusCode {
    match e {
        MediaError::Compression { .. } | MediaError::Probe(_) => StatusCode::UNPROCESSABLE_ENTITY,
        MediaError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn media_code(e: &MediaError) -> &'static str {
    match e {
        MediaError::Compression { .. } => "compression_failed",
        MediaError::Probe(_) => "probe_failed",
        MediaError::Extraction(_) => "extraction_failed",
        MediaError::Timeout(_) => "media_timeout",
        _ => "media_error",
    }
}

#[derive(Serialize)]
pub(crate) struct ErrorResponse {
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Detail shown in place of server errors in production.
pub const MASKED_DETAIL: &str = "An internal error occurred";

/// Marks an error response whose detail must not leave the server in
/// production; carries the code so the masked body keeps it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MaskableError(pub &'static str);

impl ApiError {
    /// Whether the caller can fix this by changing their request.
    pub fn is_user_actionable(&self) -> bool {
        match self {
            ApiError::NotFound(_) | ApiError::BadRequest(_) | ApiError::Validation(_) => true,
            ApiError::Analysis(e) => e.is_user_actionable(),
            ApiError::Media(e) => e.is_user_actionable(),
            ApiError::Storage(StorageError::InvalidRange(_)) => true,
            ApiError::Internal(_) | ApiError::Storage(_) => false,
        }
    }

    fn is_maskable(&self) -> bool {
        self.status_code().is_server_error() && !self.is_user_actionable()
    }

    /// Message safe to show to the caller.
    pub fn public_detail(&self, production: bool) -> String {
        if production && self.is_maskable() {
            MASKED_DETAIL.to_string()
        } else {
            self.to_string()
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        if self.is_maskable() {
            error!(status = %status, code, error = %self, "Request failed");
        } else {
            warn!(status = %status, code, error = %self, "Request rejected");
        }

        // Full detail here; `mask_internal_errors` rewrites it in production
        let body = ErrorResponse {
            detail: self.to_string(),
            code: Some(code.to_string()),
        };

        let mut response = (status, Json(body)).into_response();
        if self.is_maskable() {
            response.extensions_mut().insert(MaskableError(code));
        }
        response
    }
}
