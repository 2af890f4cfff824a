//! Strategy layer configuration.

use tracing::info;
use urocase_media::DEFAULT_THUMBNAIL_POSITION;
use urocase_models::video::BYTES_PER_MB;
use urocase_models::AnalysisMode;

/// Largest blob the inference endpoint accepts inline.
pub const INLINE_CAP_BYTES: u64 = 20 * 1024 * 1024;

/// Stills sampled by the frame strategy.
pub const DEFAULT_FRAME_COUNT: usize = 10;

/// Resolved once at startup and handed to the selector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisConfig {
    pub mode: AnalysisMode,
    pub inline_cap_bytes: u64,
    pub frame_count: usize,
    pub thumbnail_position: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            mode: AnalysisMode::default(),
            inline_cap_bytes: INLINE_CAP_BYTES,
            frame_count: DEFAULT_FRAME_COUNT,
            thumbnail_position: DEFAULT_THUMBNAIL_POSITION,
        }
    }
}

impl AnalysisConfig {
    /// Read `VIDEO_ANALYSIS_MODE`; unset or unrecognized values select
    /// `native_with_fallback`.
    pub fn from_env() -> Self {
        let raw = std::env::var("VIDEO_ANALYSIS_MODE").ok();
        let config = Self::default().with_mode(AnalysisMode::parse_lenient(raw.as_deref()));
        info!(mode = %config.mode, configured = ?raw, "Video analysis mode resolved");
        config
    }

    pub fn with_mode(mut self, mode: AnalysisMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn inline_cap_mb(&self) -> f64 {
        self.inline_cap_bytes as f64 / BYTES_PER_MB
    }
}
