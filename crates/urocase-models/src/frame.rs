//! Still frames extracted from a video.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Output image format for frame extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Jpeg,
    Png,
}

impl ImageFormat {
    /// File extension used for extracted frames.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
        }
    }

    /// Mime type of the encoded image.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }
}

/// A single extracted still.
///
/// Ordinal `0` is reserved for single-frame (thumbnail) extraction; sequence
/// extraction numbers frames `1..=N` in playback order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFrame {
    #[serde(rename = "index")]
    pub ordinal_index: u32,
    #[serde(rename = "base64")]
    pub image_bytes_base64: String,
    pub mime_type: String,
}

impl ExtractedFrame {
    /// Ordinal used for thumbnails.
    pub const THUMBNAIL_ORDINAL: u32 = 0;

    pub fn new(ordinal_index: u32, image_bytes_base64: String, format: ImageFormat) -> Self {
        Self {
            ordinal_index,
            image_bytes_base64,
            mime_type: format.mime_type().to_string(),
        }
    }

    /// Render as a `data:` URL suitable for an `<img src>`.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.image_bytes_base64)
    }
}
