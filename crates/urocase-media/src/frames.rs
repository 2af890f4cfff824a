//! Frame sampling: evenly spaced sequences and single stills.

use std::path::Path;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::{debug, info};
use urocase_models::{ExtractedFrame, ImageFormat, VideoBlob};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_duration;
use crate::workspace::ScratchDir;

/// Thumbnail position as a fraction of the duration; lands inside the
/// anatomy rather than on a blank lead-in frame.
pub const DEFAULT_THUMBNAIL_POSITION: f64 = 0.3;

/// Upper bound for one extraction run.
pub const EXTRACTION_TIMEOUT_SECS: u64 = 120;

/// JPEG quality for extracted stills (`-q:v`, lower is better).
const STILL_QUALITY: u8 = 2;

const FRAME_PREFIX: &str = "frame-";

/// Source of still frames for the analysis strategies.
#[async_trait]
pub trait FrameSampler: Send + Sync {
    /// `frame_count` evenly spaced frames, ordinals `1..=frame_count`.
    async fn sample_sequence(
        &self,
        video: &VideoBlob,
        frame_count: usize,
    ) -> MediaResult<Vec<ExtractedFrame>>;

    /// One JPEG frame at `position_fraction` of the duration, ordinal `0`.
    async fn sample_single(
        &self,
        video: &VideoBlob,
        position_fraction: f64,
    ) -> MediaResult<ExtractedFrame>;
}

/// [`FrameSampler`] backed by the ffmpeg CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegFrameSampler {
    format: ImageFormat,
}

impl FfmpegFrameSampler {
    pub fn new(format: ImageFormat) -> Self {
        Self { format }
    }
}

#[async_trait]
impl FrameSampler for FfmpegFrameSampler {
    async fn sample_sequence(
        &self,
        video: &VideoBlob,
        frame_count: usize,
    ) -> MediaResult<Vec<ExtractedFrame>> {
        sample_sequence(video, frame_count, self.format).await
    }

    async fn sample_single(
        &self,
        video: &VideoBlob,
        position_fraction: f64,
    ) -> MediaResult<ExtractedFrame> {
        sample_single(video, position_fraction).await
    }
}

/// Extract `frame_count` evenly time-spaced frames in playback order.
pub async fn sample_sequence(
    video: &VideoBlob,
    frame_count: usize,
    format: ImageFormat,
) -> MediaResult<Vec<ExtractedFrame>> {
    if frame_count == 0 {
        return Err(MediaError::extraction("Frame count must be at least 1"));
    }

    let scratch = ScratchDir::new("ct-frames-")?;
    let input = scratch.materialize(video).await?;
    let duration = probe_duration(&input).await.map_err(into_extraction)?;

    let rate = sampling_rate(frame_count, duration);
    let pattern = scratch.join(format!("{}%05d.{}", FRAME_PREFIX, format.extension()));

    debug!(frame_count, duration, rate, "Sampling frame sequence");

    let cmd = FfmpegCommand::new(&input, &pattern)
        .video_filter(format!("fps={}", rate))
        .image_quality(STILL_QUALITY)
        .frame_limit(frame_count);
    FfmpegRunner::new()
        .with_timeout(EXTRACTION_TIMEOUT_SECS)
        .run(&cmd)
        .await?;

    let files = list_frame_files(scratch.path(), format).await?;
    if files.is_empty() {
        return Err(MediaError::extraction("FFmpeg produced no frames"));
    }

    let mut frames = Vec::with_capacity(frame_count.min(files.len()));
    for (i, name) in files.iter().take(frame_count).enumerate() {
        let bytes = tokio::fs::read(scratch.join(name)).await?;
        frames.push(ExtractedFrame::new(i as u32 + 1, BASE64.encode(bytes), format));
    }
    scratch.close();

    info!(
        filename = %video.filename(),
        requested = frame_count,
        extracted = frames.len(),
        "Extracted frame sequence"
    );
    Ok(frames)
}

/// Extract a single JPEG still at `position_fraction` of the duration.
pub async fn sample_single(
    video: &VideoBlob,
    position_fraction: f64,
) -> MediaResult<ExtractedFrame> {
    if !(0.0..=1.0).contains(&position_fraction) {
        return Err(MediaError::extraction(format!(
            "Position {} is outside [0, 1]",
            position_fraction
        )));
    }

    let scratch = ScratchDir::new("ct-thumb-")?;
    let input = scratch.materialize(video).await?;
    let duration = probe_duration(&input).await.map_err(into_extraction)?;

    let seek = seek_seconds(duration, position_fraction);
    let output = scratch.join(format!("thumbnail.{}", ImageFormat::Jpeg.extension()));

    let cmd = single_frame_command(&input, &output, seek);
    FfmpegRunner::new()
        .with_timeout(EXTRACTION_TIMEOUT_SECS)
        .run(&cmd)
        .await?;

    // ffmpeg exits cleanly without writing anything when the seek overshoots
    let bytes = match tokio::fs::read(&output).await {
        Ok(bytes) if !bytes.is_empty() => bytes,
        _ => {
            return Err(MediaError::extraction(format!(
                "No frame at {:.3}s (duration {:.3}s)",
                seek, duration
            )))
        }
    };

    scratch.close();

    debug!(seek, duration, bytes = bytes.len(), "Extracted single frame");
    Ok(ExtractedFrame::new(
        ExtractedFrame::THUMBNAIL_ORDINAL,
        BASE64.encode(bytes),
        ImageFormat::Jpeg,
    ))
}

/// Seek offset for a still at `position_fraction` of `duration`.
fn seek_seconds(duration: f64, position_fraction: f64) -> f64 {
    duration * position_fraction
}

/// Input-side seek keeps extraction fast on long clips.
fn single_frame_command(input: &Path, output: &Path, seek: f64) -> FfmpegCommand {
    FfmpegCommand::new(input, output)
        .seek(seek)
        .single_frame()
        .image_quality(STILL_QUALITY)
}

/// Output rate that spreads `frame_count` frames over `duration` seconds.
fn sampling_rate(frame_count: usize, duration: f64) -> f64 {
    frame_count as f64 / duration
}

/// Probe failures during sampling surface as extraction failures.
fn into_extraction(err: MediaError) -> MediaError {
    match err {
        MediaError::Probe(msg) => MediaError::Extraction(msg),
        other => other,
    }
}

async fn list_frame_files(dir: &Path, format: ImageFormat) -> MediaResult<Vec<String>> {
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    Ok(select_frame_files(names, format))
}

/// Keep frame outputs of the given format, in emission order.
fn select_frame_files(names: Vec<String>, format: ImageFormat) -> Vec<String> {
    let suffix = format!(".{}", format.extension());
    let mut frames: Vec<String> = names
        .into_iter()
        .filter(|n| n.starts_with(FRAME_PREFIX) && n.ends_with(&suffix))
        .collect();
    // Zero-padded counters make lexical order the emission order
    frames.sort();
    frames
}
