//! The inference seam used by the analysis layer.

use async_trait::async_trait;
use urocase_models::{ChatRole, ExtractedFrame};

use crate::error::InferenceResult;
use crate::sse::TextStream;

/// An image passed inline to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub base64: String,
    pub mime_type: String,
}

impl InlineImage {
    pub fn new(base64: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            base64: base64.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Split a `data:<mime>;base64,<payload>` URL.
    ///
    /// Anything that is not a data URL is taken as a bare JPEG payload.
    pub fn from_data_url(url: &str) -> Self {
        url.strip_prefix("data:")
            .and_then(|rest| rest.split_once(";base64,"))
            .filter(|(mime, data)| !mime.is_empty() && !data.is_empty())
            .map(|(mime, data)| Self::new(data, mime))
            .unwrap_or_else(|| Self::new(url, "image/jpeg"))
    }
}

impl From<&ExtractedFrame> for InlineImage {
    fn from(frame: &ExtractedFrame) -> Self {
        Self::new(frame.image_bytes_base64.clone(), frame.mime_type.clone())
    }
}

/// One prior turn of a text conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Ai,
            content: content.into(),
        }
    }
}

/// Multimodal text generation.
///
/// Implementations never retain state between calls and never swallow
/// errors; an empty candidate list is reported as `""`.
#[async_trait]
pub trait VisionBackend: Send + Sync {
    /// Send `images` in order, followed by `prompt`.
    async fn analyze_images(&self, prompt: &str, images: &[InlineImage]) -> InferenceResult<String>;

    /// Send one inline video followed by `prompt`.
    async fn analyze_video_inline(
        &self,
        prompt: &str,
        video_base64: &str,
        mime_type: &str,
    ) -> InferenceResult<String>;

    /// Streaming variant of [`VisionBackend::analyze_video_inline`].
    async fn stream_video_inline(
        &self,
        prompt: &str,
        video_base64: &str,
        mime_type: &str,
    ) -> InferenceResult<TextStream>;

    /// Text-only multi-turn generation under a system instruction.
    async fn converse(&self, system_prompt: &str, turns: &[ChatTurn]) -> InferenceResult<String>;
}
