//! Error types for the analysis layer.

use thiserror::Error;
use urocase_media::MediaError;
use urocase_vision::InferenceError;

/// Result type for analysis operations.
pub type AnalyzeResult<T> = Result<T, AnalysisError>;

/// Errors surfaced by strategy selection and case authoring.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Native-only mode with a video over the inline payload cap.
    #[error(
        "Video too large for native analysis ({size_mb:.2}MB > {cap_mb}MB). \
         Set VIDEO_ANALYSIS_MODE=native_with_fallback to enable fallback."
    )]
    NativeTooLarge { size_mb: f64, cap_mb: f64 },

    /// Native streaming is not possible for this video or mode.
    #[error("Native video streaming unavailable: {0}")]
    NativeUnavailable(String),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error("Invalid image: {0}")]
    InvalidImage(String),
}

impl AnalysisError {
    /// Whether the caller should change their input rather than retry.
    pub fn is_user_actionable(&self) -> bool {
        match self {
            AnalysisError::NativeTooLarge { .. } | AnalysisError::InvalidImage(_) => true,
            AnalysisError::Media(e) => e.is_user_actionable(),
            _ => false,
        }
    }
}
