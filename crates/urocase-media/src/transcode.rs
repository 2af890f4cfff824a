//! Size-bounded transcoding for durable storage.
//!
//! Encodes walk a descending quality ladder and stop at the first output that
//! fits the budget. When the source is already over budget, the last rung also
//! caps the width so the final attempt has the best chance of fitting.

use std::path::Path;
use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{debug, info, warn};
use urocase_models::encoding::{
    DEFAULT_AUDIO_BITRATE, DEFAULT_AUDIO_CODEC, DEFAULT_PIXEL_FORMAT, DEFAULT_VIDEO_CODEC,
};
use urocase_models::video::BYTES_PER_MB;
use urocase_models::{CompressionConfig, VideoBlob};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::workspace::ScratchDir;

/// Upper bound for a single encode attempt.
pub const COMPRESSION_TIMEOUT_SECS: u64 = 600;

/// Concrete settings for one encode attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodePlan {
    pub crf: u8,
    pub preset: String,
    /// Maximum output width, aspect ratio preserved
    pub max_width: Option<u32>,
}

impl EncodePlan {
    fn apply(&self, cmd: FfmpegCommand) -> FfmpegCommand {
        let cmd = match self.max_width {
            Some(width) => cmd.video_filter(format!("scale='min({},iw)':-2", width)),
            None => cmd,
        };
        cmd.video_codec(DEFAULT_VIDEO_CODEC)
            .crf(self.crf)
            .preset(self.preset.clone())
            .pixel_format(DEFAULT_PIXEL_FORMAT)
            .audio_codec(DEFAULT_AUDIO_CODEC)
            .audio_bitrate(DEFAULT_AUDIO_BITRATE)
            .output_args(["-movflags", "+faststart"])
    }
}

/// Expand the configured ladder into encode attempts for a source of `original_size` bytes.
pub fn plan_ladder(config: &CompressionConfig, original_size: u64) -> Vec<EncodePlan> {
    let over_budget = original_size > config.max_size_bytes();
    let last = config.ladder.len().saturating_sub(1);

    config
        .ladder
        .iter()
        .enumerate()
        .map(|(i, rung)| EncodePlan {
            crf: rung.crf,
            preset: rung.preset.clone(),
            max_width: (i == last && over_budget).then_some(config.resolution_cap_width),
        })
        .collect()
}

/// Re-encode `video` until it fits `config.max_size_mb`.
///
/// Fails with [`MediaError::Compression`] once every rung has been tried.
/// This is a long-running, CPU-bound call; run it only after analysis has
/// succeeded.
pub async fn compress(video: &VideoBlob, config: &CompressionConfig) -> MediaResult<VideoBlob> {
    let started = Instant::now();
    let scratch = ScratchDir::new("ct-compress-")?;
    let input = scratch.materialize(video).await?;

    let plans = plan_ladder(config, video.size_bytes());
    let budget = config.max_size_bytes();
    let mut last_size = video.size_bytes();

    for (attempt, plan) in plans.iter().enumerate() {
        let output = scratch.join(format!("output-{}.mp4", attempt));
        let cmd = plan.apply(FfmpegCommand::new(&input, &output));

        debug!(
            attempt,
            crf = plan.crf,
            preset = %plan.preset,
            max_width = ?plan.max_width,
            "Encoding"
        );
        counter!("urocase_compression_attempts_total").increment(1);

        FfmpegRunner::new()
            .with_timeout(COMPRESSION_TIMEOUT_SECS)
            .run_with_progress(&cmd, move |p| {
                debug!(attempt, out_time_ms = p.out_time_ms, speed = p.speed, "Encode progress");
            })
            .await?;

        last_size = tokio::fs::metadata(&output).await?.len();
        info!(
            attempt,
            crf = plan.crf,
            input_mb = format!("{:.2}", video.size_mb()),
            output_mb = format!("{:.2}", last_size as f64 / BYTES_PER_MB),
            max_mb = config.max_size_mb,
            "Video compressed"
        );

        if last_size <= budget {
            let bytes = tokio::fs::read(&output).await?;
            scratch.close();
            histogram!("urocase_compression_duration_seconds")
                .record(started.elapsed().as_secs_f64());
            return Ok(VideoBlob::new(bytes, output_filename(video.filename())));
        }

        // Previous rung output is no longer needed
        let _ = tokio::fs::remove_file(&output).await;
    }

    warn!(
        filename = %video.filename(),
        final_mb = last_size as f64 / BYTES_PER_MB,
        max_mb = config.max_size_mb,
        "Compression ladder exhausted"
    );

    Err(MediaError::Compression {
        final_size_mb: last_size as f64 / BYTES_PER_MB,
        max_size_mb: config.max_size_mb,
    })
}

/// Stored videos are always MP4.
fn output_filename(original: &str) -> String {
    let stem = Path::new(original)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("video");
    format!("{}.mp4", stem)
}
