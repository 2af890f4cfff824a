//! Strategy selection between native video and frame extraction.
//!
//! | Mode                   | Eligible (size <= cap)           | Ineligible        |
//! |------------------------|----------------------------------|-------------------|
//! | `legacy`               | frames                           | frames            |
//! | `native`               | native                           | `NativeTooLarge`  |
//! | `native_with_fallback` | native, frames if native fails   | frames            |
//!
//! Only native failures are caught, and only in `native_with_fallback`.
//! Frame extraction is the last resort; its failures propagate unchanged.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use metrics::{counter, histogram};
use tracing::{info, warn};
use urocase_media::FrameSampler;
use urocase_models::{AnalysisMode, AnalysisResult, VideoBlob};
use urocase_vision::{TextStream, VisionBackend};

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalyzeResult};
use crate::prompts;
use crate::strategy::{Strategy, StrategyContext};

/// Everything needed to start a native streaming session.
#[derive(Clone)]
pub struct StreamingPayload {
    pub video_base64: String,
    pub mime_type: String,
    pub prompt: String,
}

impl fmt::Debug for StreamingPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingPayload")
            .field("video_base64_len", &self.video_base64.len())
            .field("mime_type", &self.mime_type)
            .field("prompt_len", &self.prompt.len())
            .finish()
    }
}

/// Chooses and runs an analysis strategy per the configured mode.
#[derive(Clone)]
pub struct AnalysisSelector {
    config: AnalysisConfig,
    backend: Arc<dyn VisionBackend>,
    sampler: Arc<dyn FrameSampler>,
}

impl AnalysisSelector {
    pub fn new(
        config: AnalysisConfig,
        backend: Arc<dyn VisionBackend>,
        sampler: Arc<dyn FrameSampler>,
    ) -> Self {
        Self {
            config,
            backend,
            sampler,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    fn context(&self) -> StrategyContext<'_> {
        StrategyContext {
            backend: self.backend.as_ref(),
            sampler: self.sampler.as_ref(),
            config: &self.config,
        }
    }

    /// Analyze a video with the strategy the mode and size call for.
    pub async fn analyze(
        &self,
        video: &VideoBlob,
        attending: Option<&str>,
    ) -> AnalyzeResult<AnalysisResult> {
        let started = Instant::now();
        info!(
            mode = %self.config.mode,
            filename = %video.filename(),
            size_mb = format!("{:.2}", video.size_mb()),
            "Starting video analysis"
        );

        let result = self.select_and_run(video, attending).await;

        if let Ok(analysis) = &result {
            let strategy = analysis.strategy_used.as_str();
            counter!("urocase_analyses_total", "strategy" => strategy).increment(1);
            histogram!("urocase_analysis_duration_seconds", "strategy" => strategy)
                .record(started.elapsed().as_secs_f64());
        } else {
            counter!("urocase_analysis_failures_total").increment(1);
        }
        result
    }

    async fn select_and_run(
        &self,
        video: &VideoBlob,
        attending: Option<&str>,
    ) -> AnalyzeResult<AnalysisResult> {
        let ctx = self.context();
        let eligible = Strategy::Native.can_handle(video.size_bytes(), &self.config);

        match self.config.mode {
            AnalysisMode::Legacy => {
                info!("Using frame extraction (legacy mode)");
                Strategy::FrameExtraction.analyze(ctx, video, attending).await
            }
            AnalysisMode::Native => {
                if !eligible {
                    return Err(self.too_large(video));
                }
                info!("Using native video analysis (no fallback)");
                Strategy::Native.analyze(ctx, video, attending).await
            }
            AnalysisMode::NativeWithFallback => {
                if eligible {
                    match Strategy::Native.analyze(ctx, video, attending).await {
                        Ok(result) => return Ok(result),
                        Err(e) => {
                            counter!("urocase_analysis_fallbacks_total").increment(1);
                            warn!(
                                error = %e,
                                "Native video analysis failed, falling back to frame extraction"
                            );
                        }
                    }
                } else {
                    info!(
                        size_mb = format!("{:.2}", video.size_mb()),
                        cap_mb = self.config.inline_cap_mb(),
                        "Video too large for native analysis, using frame extraction"
                    );
                }
                Strategy::FrameExtraction.analyze(ctx, video, attending).await
            }
        }
    }

    fn too_large(&self, video: &VideoBlob) -> AnalysisError {
        AnalysisError::NativeTooLarge {
            size_mb: video.size_mb(),
            cap_mb: self.config.inline_cap_mb(),
        }
    }

    /// Build the inline payload for a streaming session.
    ///
    /// Fails with `NativeUnavailable` in legacy mode or when the video is over
    /// the inline cap; callers then fall back to [`AnalysisSelector::analyze`].
    pub fn prepare_streaming(
        &self,
        video: &VideoBlob,
        attending: Option<&str>,
    ) -> AnalyzeResult<StreamingPayload> {
        if self.config.mode == AnalysisMode::Legacy {
            return Err(AnalysisError::NativeUnavailable(
                "legacy mode uses frame extraction".to_string(),
            ));
        }
        if !Strategy::Native.can_handle(video.size_bytes(), &self.config) {
            return Err(AnalysisError::NativeUnavailable(format!(
                "video is {:.2}MB, inline limit is {}MB",
                video.size_mb(),
                self.config.inline_cap_mb()
            )));
        }

        Ok(StreamingPayload {
            video_base64: BASE64.encode(video.bytes()),
            mime_type: video.mime_type().to_string(),
            prompt: prompts::native_video(attending),
        })
    }

    /// Start streaming the explanation for a prepared payload.
    pub async fn stream(&self, payload: &StreamingPayload) -> AnalyzeResult<TextStream> {
        let stream = self
            .backend
            .stream_video_inline(&payload.prompt, &payload.video_base64, &payload.mime_type)
            .await?;
        Ok(stream)
    }

    /// Thumbnail data URL for a video analyzed by streaming.
    pub async fn thumbnail_for(&self, video: &VideoBlob) -> AnalyzeResult<String> {
        let frame = self
            .sampler
            .sample_single(video, self.config.thumbnail_position)
            .await?;
        Ok(frame.to_data_url())
    }
}
