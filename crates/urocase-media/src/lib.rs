//! FFmpeg CLI wrapper for CT scan video handling.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - Per-call scratch directories that are always removed
//! - Video probing (duration, resolution, frame rate)
//! - Evenly spaced frame sampling and single-frame thumbnails
//! - Size-bounded transcoding over a descending quality ladder

pub mod command;
pub mod error;
pub mod frames;
pub mod probe;
pub mod processor;
pub mod progress;
pub mod transcode;
pub mod workspace;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use frames::{
    sample_sequence, sample_single, FfmpegFrameSampler, FrameSampler, DEFAULT_THUMBNAIL_POSITION,
};
pub use probe::{probe_duration, probe_video};
pub use processor::{FfmpegVideoProcessor, VideoProcessor};
pub use progress::FfmpegProgress;
pub use transcode::{compress, plan_ladder, EncodePlan};
pub use workspace::ScratchDir;
