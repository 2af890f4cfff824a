//! The two analysis strategies.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::info;
use urocase_media::{FrameSampler, MediaError};
use urocase_models::{AnalysisResult, AnalysisStrategyName, ExtractedFrame, VideoBlob};
use urocase_vision::{InlineImage, VisionBackend};

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalyzeResult};
use crate::prompts;

/// Collaborators a strategy runs against.
#[derive(Clone, Copy)]
pub struct StrategyContext<'a> {
    pub backend: &'a dyn VisionBackend,
    pub sampler: &'a dyn FrameSampler,
    pub config: &'a AnalysisConfig,
}

/// How a video is turned into a teaching explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Whole video inline, thumbnail extracted separately
    Native,
    /// Evenly spaced stills as an ordered image sequence
    FrameExtraction,
}

impl Strategy {
    pub fn name(&self) -> AnalysisStrategyName {
        match self {
            Strategy::Native => AnalysisStrategyName::Native,
            Strategy::FrameExtraction => AnalysisStrategyName::Frames,
        }
    }

    /// Whether a video of `size_bytes` is eligible.
    pub fn can_handle(&self, size_bytes: u64, config: &AnalysisConfig) -> bool {
        match self {
            Strategy::Native => size_bytes <= config.inline_cap_bytes,
            Strategy::FrameExtraction => true,
        }
    }

    pub async fn analyze(
        &self,
        ctx: StrategyContext<'_>,
        video: &VideoBlob,
        attending: Option<&str>,
    ) -> AnalyzeResult<AnalysisResult> {
        match self {
            Strategy::Native => analyze_native(ctx, video, attending).await,
            Strategy::FrameExtraction => analyze_frames(ctx, video, attending).await,
        }
    }
}

async fn analyze_native(
    ctx: StrategyContext<'_>,
    video: &VideoBlob,
    attending: Option<&str>,
) -> AnalyzeResult<AnalysisResult> {
    info!(
        filename = %video.filename(),
        size_mb = format!("{:.2}", video.size_mb()),
        "Native video analysis"
    );

    if !Strategy::Native.can_handle(video.size_bytes(), ctx.config) {
        return Err(AnalysisError::NativeTooLarge {
            size_mb: video.size_mb(),
            cap_mb: ctx.config.inline_cap_mb(),
        });
    }

    let video_base64 = BASE64.encode(video.bytes());
    let prompt = prompts::native_video(attending);
    let explanation = ctx
        .backend
        .analyze_video_inline(&prompt, &video_base64, video.mime_type())
        .await?;

    let thumbnail = ctx
        .sampler
        .sample_single(video, ctx.config.thumbnail_position)
        .await?;

    info!(filename = %video.filename(), chars = explanation.len(), "Native analysis complete");
    Ok(AnalysisResult {
        explanation_text: explanation,
        thumbnail_data_url: thumbnail.to_data_url(),
        strategy_used: AnalysisStrategyName::Native,
    })
}

async fn analyze_frames(
    ctx: StrategyContext<'_>,
    video: &VideoBlob,
    attending: Option<&str>,
) -> AnalyzeResult<AnalysisResult> {
    info!(
        filename = %video.filename(),
        frame_count = ctx.config.frame_count,
        "Frame extraction analysis"
    );

    let frames = ctx
        .sampler
        .sample_sequence(video, ctx.config.frame_count)
        .await?;
    let thumbnail = thumbnail_frame(&frames)
        .ok_or_else(|| MediaError::extraction("No frames extracted"))?
        .to_data_url();

    let prompt = prompts::frame_sequence(attending, frames.len());
    let images: Vec<InlineImage> = frames.iter().map(InlineImage::from).collect();
    let explanation = ctx.backend.analyze_images(&prompt, &images).await?;

    info!(
        filename = %video.filename(),
        frames = frames.len(),
        chars = explanation.len(),
        "Frame analysis complete"
    );
    Ok(AnalysisResult {
        explanation_text: explanation,
        thumbnail_data_url: thumbnail,
        strategy_used: AnalysisStrategyName::Frames,
    })
}

/// Thumbnail reused from the sampled sequence: index `min(4, len / 2)`.
fn thumbnail_frame(frames: &[ExtractedFrame]) -> Option<&ExtractedFrame> {
    frames.get(4.min(frames.len() / 2))
}
