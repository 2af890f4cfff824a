//! FFprobe video information.

use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;

use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info};
use urocase_models::{VideoBlob, VideoMetadata};

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};
use crate::workspace::ScratchDir;

/// Upper bound for a single ffprobe invocation.
pub const PROBE_TIMEOUT_SECS: u64 = 120;

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

const METADATA_ARGS: &[&str] = &[
    "-v",
    "error",
    "-print_format",
    "json",
    "-show_format",
    "-show_streams",
];

/// Probe an uploaded video for duration, resolution and frame rate.
///
/// The blob is written to a private scratch directory that is removed before
/// this returns, whichever way it returns.
pub async fn probe_video(video: &VideoBlob) -> MediaResult<VideoMetadata> {
    if video.bytes().is_empty() {
        return Err(MediaError::probe("Video payload is empty"));
    }

    let scratch = ScratchDir::new("ct-info-")?;
    let input = scratch.materialize(video).await?;

    let output = run_ffprobe(METADATA_ARGS, &input).await?;

    if !output.status.success() {
        return Err(MediaError::probe(format!(
            "FFprobe rejected {}: {}",
            video.filename(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let metadata = parse_probe_output(&output.stdout)?;
    info!(
        filename = %video.filename(),
        duration = metadata.duration_seconds,
        width = metadata.width_px,
        height = metadata.height_px,
        fps = metadata.fps,
        "Probed video"
    );
    Ok(metadata)
}

const DURATION_ARGS: &[&str] = &[
    "-v",
    "error",
    "-show_entries",
    "format=duration",
    "-of",
    "default=noprint_wrappers=1:nokey=1",
];

/// Container duration of a file already on disk.
pub async fn probe_duration(path: impl AsRef<Path>) -> MediaResult<f64> {
    let path = path.as_ref();
    let output = run_ffprobe(DURATION_ARGS, path).await?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    debug!(path = %path.display(), raw = %stdout.trim(), "Probed duration");

    parse_duration(&stdout).ok_or_else(|| {
        MediaError::probe(format!(
            "Could not determine video duration (got {:?})",
            stdout.trim()
        ))
    })
}

async fn run_ffprobe(args: &[&str], path: &Path) -> MediaResult<Output> {
    check_ffprobe()?;

    let child = Command::new("ffprobe")
        .args(args)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    match tokio::time::timeout(Duration::from_secs(PROBE_TIMEOUT_SECS), child).await {
        Ok(output) => output.map_err(|e| MediaError::FfprobeFailed {
            message: e.to_string(),
            stderr: None,
        }),
        Err(_) => Err(MediaError::Timeout(PROBE_TIMEOUT_SECS)),
    }
}

/// Turn ffprobe JSON into metadata, rejecting streamless or durationless media.
fn parse_probe_output(stdout: &[u8]) -> MediaResult<VideoMetadata> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)
        .map_err(|e| MediaError::probe(format!("Unreadable ffprobe output: {}", e)))?;

    let stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| MediaError::probe("No video stream found"))?;

    let raw_duration = stream
        .duration
        .as_deref()
        .or_else(|| probe.format.as_ref().and_then(|f| f.duration.as_deref()));

    let duration = raw_duration
        .and_then(parse_duration)
        .ok_or_else(|| MediaError::probe(format!("Invalid duration: {:?}", raw_duration)))?;

    let fps = stream
        .avg_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_frame_rate))
        .unwrap_or(30.0);

    Ok(VideoMetadata {
        duration_seconds: duration,
        width_px: stream.width.unwrap_or(0),
        height_px: stream.height.unwrap_or(0),
        fps,
    })
}

/// Parse a duration in seconds; only finite, positive values are usable.
fn parse_duration(s: &str) -> Option<f64> {
    let value: f64 = s.trim().parse().ok()?;
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    let rate = if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den <= 0.0 {
            return None;
        }
        num / den
    } else {
        s.parse().ok()?
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}
