//! Probe and transcode seam used by the HTTP layer.

use async_trait::async_trait;
use urocase_models::{CompressionConfig, VideoBlob, VideoMetadata};

use crate::error::MediaResult;
use crate::probe::probe_video;
use crate::transcode::compress;

/// Whole-video operations: metadata and size-bounded re-encoding.
#[async_trait]
pub trait VideoProcessor: Send + Sync {
    async fn probe(&self, video: &VideoBlob) -> MediaResult<VideoMetadata>;

    async fn compress(
        &self,
        video: &VideoBlob,
        config: &CompressionConfig,
    ) -> MediaResult<VideoBlob>;
}

/// [`VideoProcessor`] backed by the ffmpeg and ffprobe CLIs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegVideoProcessor;

#[async_trait]
impl VideoProcessor for FfmpegVideoProcessor {
    async fn probe(&self, video: &VideoBlob) -> MediaResult<VideoMetadata> {
        probe_video(video).await
    }

    async fn compress(
        &self,
        video: &VideoBlob,
        config: &CompressionConfig,
    ) -> MediaResult<VideoBlob> {
        compress(video, config).await
    }
}
