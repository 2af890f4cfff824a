//! Storage transcoding configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "128k";
/// Pixel format with broad browser support
pub const DEFAULT_PIXEL_FORMAT: &str = "yuv420p";

/// Default size ceiling for stored videos.
pub const DEFAULT_MAX_SIZE_MB: f64 = 50.0;
/// Width the final ladder rung scales down to when the source is oversized.
pub const DEFAULT_RESOLUTION_CAP_WIDTH: u32 = 1280;

/// One encode attempt on the quality ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CompressionRung {
    /// Constant Rate Factor (0-51, lower is better quality)
    pub crf: u8,
    /// Encoder preset
    pub preset: String,
}

impl CompressionRung {
    pub fn new(crf: u8, preset: impl Into<String>) -> Self {
        Self {
            crf,
            preset: preset.into(),
        }
    }
}

/// Descending-quality ladder and size budget for stored videos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CompressionConfig {
    /// Maximum output size in MiB
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: f64,

    /// Attempts in order, best quality first
    #[serde(default = "default_ladder")]
    pub ladder: Vec<CompressionRung>,

    /// Width cap applied on the last rung when the source exceeds the budget
    #[serde(default = "default_resolution_cap_width")]
    pub resolution_cap_width: u32,
}

fn default_max_size_mb() -> f64 {
    DEFAULT_MAX_SIZE_MB
}
fn default_resolution_cap_width() -> u32 {
    DEFAULT_RESOLUTION_CAP_WIDTH
}
fn default_ladder() -> Vec<CompressionRung> {
    vec![
        CompressionRung::new(18, "slow"),
        CompressionRung::new(23, "medium"),
        CompressionRung::new(28, "medium"),
        CompressionRung::new(32, "fast"),
    ]
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            max_size_mb: DEFAULT_MAX_SIZE_MB,
            ladder: default_ladder(),
            resolution_cap_width: DEFAULT_RESOLUTION_CAP_WIDTH,
        }
    }
}

impl CompressionConfig {
    /// Default ladder with the ceiling read from `VIDEO_MAX_SIZE_MB`.
    /// Non-positive or unparsable values keep the default.
    pub fn from_env() -> Self {
        let max_size_mb = std::env::var("VIDEO_MAX_SIZE_MB")
            .ok()
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|mb| mb.is_finite() && *mb > 0.0)
            .unwrap_or(DEFAULT_MAX_SIZE_MB);
        Self::default().with_max_size_mb(max_size_mb)
    }

    /// Returns a new config with an updated size ceiling.
    pub fn with_max_size_mb(mut self, max_size_mb: f64) -> Self {
        self.max_size_mb = max_size_mb;
        self
    }

    /// Size ceiling in bytes.
    pub fn max_size_bytes(&self) -> u64 {
        (self.max_size_mb * crate::video::BYTES_PER_MB) as u64
    }
}
