//! Error types for media operations.

use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    /// The container has no decodable video stream or an unusable duration.
    #[error("Could not probe video: {0}")]
    Probe(String),

    /// Frame sampling produced nothing usable.
    #[error("Frame extraction failed: {0}")]
    Extraction(String),

    /// Every rung of the quality ladder overshot the size budget.
    #[error(
        "Compressed video ({final_size_mb:.2}MB) exceeds max size of {max_size_mb}MB. \
         Please upload a shorter clip."
    )]
    Compression { final_size_mb: f64, max_size_mb: f64 },

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a probe failure error.
    pub fn probe(message: impl Into<String>) -> Self {
        Self::Probe(message.into())
    }

    /// Create an extraction failure error.
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction(message.into())
    }

    /// Whether the error asks the user to change their upload.
    pub fn is_user_actionable(&self) -> bool {
        matches!(self, MediaError::Compression { .. } | MediaError::Probe(_))
    }
}
