//! In-process stand-ins for the inference endpoint and ffmpeg.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::StreamExt;
use urocase_media::{FrameSampler, MediaError, MediaResult};
use urocase_models::{ExtractedFrame, ImageFormat, VideoBlob};
use urocase_vision::{
    ChatTurn, InferenceError, InferenceResult, InlineImage, TextStream, VisionBackend,
};

pub const EXPLANATION: &str = "1. OVERVIEW: Axial contrast-enhanced CT of the abdomen.\n\
2. SCROLL ANALYSIS: The kidneys come into view at L1.\n\
3. KEY FINDINGS: A 9 mm obstructing calculus at the left UPJ.\n\
4. TEACHING POINTS: Look for perinephric stranding.\n\
5. DIFFERENTIAL CONSIDERATIONS: Phlebolith, vascular calcification.";

/// Deterministic backend that records what it was asked.
#[derive(Default)]
pub struct StubBackend {
    fail_native: bool,
    reply: Option<String>,
    video_calls: AtomicUsize,
    image_calls: AtomicUsize,
    chat_calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    image_counts: Mutex<Vec<usize>>,
    turns: Mutex<Vec<Vec<ChatTurn>>>,
}

impl StubBackend {
    /// Native calls fail with an upstream 500.
    pub fn failing_native() -> Self {
        Self {
            fail_native: true,
            ..Self::default()
        }
    }

    /// Every call answers with `reply` instead of the canned explanation.
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            ..Self::default()
        }
    }

    fn answer(&self) -> String {
        self.reply.clone().unwrap_or_else(|| EXPLANATION.to_string())
    }

    fn record(&self, prompt: &str) {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
    }

    pub fn video_calls(&self) -> usize {
        self.video_calls.load(Ordering::SeqCst)
    }

    pub fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }

    pub fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.video_calls() + self.image_calls() + self.chat_calls()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().ok()?.last().cloned()
    }

    pub fn last_image_count(&self) -> Option<usize> {
        self.image_counts.lock().ok()?.last().copied()
    }

    pub fn last_turns(&self) -> Option<Vec<ChatTurn>> {
        self.turns.lock().ok()?.last().cloned()
    }

    fn native_error() -> InferenceError {
        InferenceError::Api {
            status: 500,
            body: "internal".to_string(),
        }
    }
}

#[async_trait]
impl VisionBackend for StubBackend {
    async fn analyze_images(
        &self,
        prompt: &str,
        images: &[InlineImage],
    ) -> InferenceResult<String> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        self.record(prompt);
        if let Ok(mut counts) = self.image_counts.lock() {
            counts.push(images.len());
        }
        Ok(self.answer())
    }

    async fn analyze_video_inline(
        &self,
        prompt: &str,
        _video_base64: &str,
        _mime_type: &str,
    ) -> InferenceResult<String> {
        self.video_calls.fetch_add(1, Ordering::SeqCst);
        self.record(prompt);
        if self.fail_native {
            return Err(Self::native_error());
        }
        Ok(self.answer())
    }

    async fn stream_video_inline(
        &self,
        prompt: &str,
        _video_base64: &str,
        _mime_type: &str,
    ) -> InferenceResult<TextStream> {
        self.video_calls.fetch_add(1, Ordering::SeqCst);
        self.record(prompt);
        if self.fail_native {
            return Err(Self::native_error());
        }
        let chunks: Vec<InferenceResult<String>> = self
            .answer()
            .split_inclusive('\n')
            .map(|line| Ok(line.to_string()))
            .collect();
        Ok(futures_util::stream::iter(chunks).boxed())
    }

    async fn converse(&self, system_prompt: &str, turns: &[ChatTurn]) -> InferenceResult<String> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        self.record(system_prompt);
        if let Ok(mut all) = self.turns.lock() {
            all.push(turns.to_vec());
        }
        Ok(self.answer())
    }
}

/// Sampler that fabricates frames without touching ffmpeg.
#[derive(Default)]
pub struct StubSampler {
    fail_sequence: bool,
    sequence_calls: AtomicUsize,
    singles: Mutex<Vec<f64>>,
}

impl StubSampler {
    pub fn failing_sequence() -> Self {
        Self {
            fail_sequence: true,
            ..Self::default()
        }
    }

    pub fn sequence_calls(&self) -> usize {
        self.sequence_calls.load(Ordering::SeqCst)
    }

    pub fn single_calls(&self) -> usize {
        self.single_positions().len()
    }

    pub fn single_positions(&self) -> Vec<f64> {
        self.singles.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl FrameSampler for StubSampler {
    async fn sample_sequence(
        &self,
        _video: &VideoBlob,
        frame_count: usize,
    ) -> MediaResult<Vec<ExtractedFrame>> {
        self.sequence_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sequence {
            return Err(MediaError::extraction("FFmpeg produced no frames"));
        }
        Ok((1..=frame_count as u32)
            .map(|i| ExtractedFrame::new(i, format!("frame-{}", i), ImageFormat::Jpeg))
            .collect())
    }

    async fn sample_single(
        &self,
        _video: &VideoBlob,
        position_fraction: f64,
    ) -> MediaResult<ExtractedFrame> {
        if let Ok(mut singles) = self.singles.lock() {
            singles.push(position_fraction);
        }
        Ok(ExtractedFrame::new(
            ExtractedFrame::THUMBNAIL_ORDINAL,
            "thumb".to_string(),
            ImageFormat::Jpeg,
        ))
    }
}
