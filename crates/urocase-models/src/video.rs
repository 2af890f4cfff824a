//! Uploaded video payloads and probed metadata.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Bytes per mebibyte, used for every size threshold in the backend.
pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// An uploaded video: opaque bytes plus the declared filename.
///
/// The filename carries the container hint used to pick a mime type. A blob
/// is immutable once received; it is never written to durable storage
/// directly, only after it has been transcoded.
#[derive(Clone, PartialEq, Eq)]
pub struct VideoBlob {
    bytes: Vec<u8>,
    filename: String,
}

impl VideoBlob {
    /// Wrap uploaded bytes.
    pub fn new(bytes: impl Into<Vec<u8>>, filename: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            filename: filename.into(),
        }
    }

    /// Raw payload.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Declared filename.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Payload size in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Payload size in mebibytes.
    pub fn size_mb(&self) -> f64 {
        self.bytes.len() as f64 / BYTES_PER_MB
    }

    /// Mime type implied by the filename extension.
    pub fn mime_type(&self) -> &'static str {
        mime_type_for_filename(&self.filename)
    }

    /// Lowercased filename extension, if any.
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }

    /// Consume the blob, returning the payload.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl std::fmt::Debug for VideoBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoBlob")
            .field("filename", &self.filename)
            .field("size_bytes", &self.bytes.len())
            .finish()
    }
}

/// Map a filename to a video mime type. Unknown extensions default to mp4.
pub fn mime_type_for_filename(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        _ => "video/mp4",
    }
}

/// Probed video information. Derived per request, never cached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    /// Duration in seconds
    #[serde(rename = "duration")]
    pub duration_seconds: f64,
    /// Width in pixels
    #[serde(rename = "width")]
    pub width_px: u32,
    /// Height in pixels
    #[serde(rename = "height")]
    pub height_px: u32,
    /// Frame rate
    pub fps: f64,
}
