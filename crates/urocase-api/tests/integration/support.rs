//! Test doubles and request helpers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use futures_util::StreamExt;
use tower::ServiceExt;
use urocase_analysis::{prompts, AnalysisConfig};
use urocase_api::{create_router, ApiConfig, AppState};
use urocase_media::{FrameSampler, MediaError, MediaResult, VideoProcessor};
use urocase_models::{
    CompressionConfig, ExtractedFrame, ImageFormat, VideoBlob, VideoMetadata,
};
use urocase_storage::{InMemoryCaseRepository, MemoryObjectStore};
use urocase_vision::{
    ChatTurn, InferenceError, InferenceResult, InlineImage, TextStream, VisionBackend,
};

pub const EXPLANATION: &str = "1. OVERVIEW: Axial contrast-enhanced CT of the abdomen.\n\
2. SCROLL ANALYSIS: The left kidney is enlarged.\n\
3. KEY FINDINGS: A 9 mm calculus at the left UPJ.\n\
4. TEACHING POINTS: Follow the ureter caudally.\n\
5. DIFFERENTIAL CONSIDERATIONS: Phlebolith.";

pub const TITLE: &str = "Obstructing Left UPJ Stone";
pub const CHAT_REPLY: &str = "It measures about 9 mm.";

/// Canned model replies keyed on the system prompt.
#[derive(Default)]
pub struct FakeBackend {
    pub fail_native: bool,
    pub video_calls: AtomicUsize,
    pub image_calls: AtomicUsize,
}

impl FakeBackend {
    fn native_error() -> InferenceError {
        InferenceError::Api {
            status: 500,
            body: "upstream unavailable".to_string(),
        }
    }
}

#[async_trait]
impl VisionBackend for FakeBackend {
    async fn analyze_images(
        &self,
        _prompt: &str,
        _images: &[InlineImage],
    ) -> InferenceResult<String> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        Ok(EXPLANATION.to_string())
    }

    async fn analyze_video_inline(
        &self,
        _prompt: &str,
        _video: &str,
        _mime: &str,
    ) -> InferenceResult<String> {
        self.video_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_native {
            return Err(Self::native_error());
        }
        Ok(EXPLANATION.to_string())
    }

    async fn stream_video_inline(
        &self,
        _prompt: &str,
        _video: &str,
        _mime: &str,
    ) -> InferenceResult<TextStream> {
        self.video_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_native {
            return Err(Self::native_error());
        }
        let chunks: Vec<InferenceResult<String>> = EXPLANATION
            .split_inclusive('\n')
            .map(|line| Ok(line.to_string()))
            .collect();
        Ok(futures_util::stream::iter(chunks).boxed())
    }

    async fn converse(&self, system_prompt: &str, _turns: &[ChatTurn]) -> InferenceResult<String> {
        Ok(if system_prompt == prompts::TITLE_PROMPT {
            format!("\"{}\"", TITLE)
        } else if system_prompt == prompts::CATEGORY_PROMPT {
            "Stones".to_string()
        } else {
            CHAT_REPLY.to_string()
        })
    }
}

pub struct FakeSampler;

#[async_trait]
impl FrameSampler for FakeSampler {
    async fn sample_sequence(
        &self,
        _video: &VideoBlob,
        frame_count: usize,
    ) -> MediaResult<Vec<ExtractedFrame>> {
        Ok((1..=frame_count as u32)
            .map(|i| ExtractedFrame::new(i, format!("frame-{}", i), ImageFormat::Jpeg))
            .collect())
    }

    async fn sample_single(
        &self,
        _video: &VideoBlob,
        _position: f64,
    ) -> MediaResult<ExtractedFrame> {
        Ok(ExtractedFrame::new(
            ExtractedFrame::THUMBNAIL_ORDINAL,
            "thumb".to_string(),
            ImageFormat::Jpeg,
        ))
    }
}

/// Probe returns a fixed 12 s 1080p clip; compress halves the payload.
#[derive(Default)]
pub struct FakeProcessor {
    pub fail_compress: bool,
    pub compress_calls: AtomicUsize,
}

#[async_trait]
impl VideoProcessor for FakeProcessor {
    async fn probe(&self, video: &VideoBlob) -> MediaResult<VideoMetadata> {
        if video.bytes().starts_with(b"garbage") {
            return Err(MediaError::probe("no video stream"));
        }
        Ok(VideoMetadata {
            duration_seconds: 12.0,
            width_px: 1920,
            height_px: 1080,
            fps: 30.0,
        })
    }

    async fn compress(
        &self,
        video: &VideoBlob,
        config: &CompressionConfig,
    ) -> MediaResult<VideoBlob> {
        self.compress_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_compress {
            return Err(MediaError::Compression {
                final_size_mb: 72.5,
                max_size_mb: config.max_size_mb,
            });
        }
        let half = video.bytes()[..video.bytes().len() / 2].to_vec();
        Ok(VideoBlob::new(half, "scan.mp4"))
    }
}

/// Router plus handles on every collaborator.
pub struct TestApp {
    pub router: Router,
    pub backend: Arc<FakeBackend>,
    pub processor: Arc<FakeProcessor>,
    pub objects: Arc<MemoryObjectStore>,
    pub cases: Arc<InMemoryCaseRepository>,
}

pub struct TestAppBuilder {
    config: ApiConfig,
    analysis: AnalysisConfig,
    backend: FakeBackend,
    processor: FakeProcessor,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self {
            config: ApiConfig::default(),
            analysis: AnalysisConfig::default(),
            backend: FakeBackend::default(),
            processor: FakeProcessor::default(),
        }
    }

    pub fn analysis(mut self, analysis: AnalysisConfig) -> Self {
        self.analysis = analysis;
        self
    }

    pub fn rate_limit_rps(mut self, rps: u32) -> Self {
        self.config.rate_limit_rps = rps;
        self
    }

    pub fn production(mut self) -> Self {
        self.config.environment = "production".to_string();
        self
    }

    pub fn failing_native(mut self) -> Self {
        self.backend.fail_native = true;
        self
    }

    pub fn failing_compression(mut self) -> Self {
        self.processor.fail_compress = true;
        self
    }

    pub fn build(self) -> TestApp {
        let backend = Arc::new(self.backend);
        let processor = Arc::new(self.processor);
        let objects = Arc::new(MemoryObjectStore::new());
        let cases = Arc::new(InMemoryCaseRepository::new());

        let state = AppState::new(
            self.config,
            self.analysis,
            backend.clone(),
            Arc::new(FakeSampler),
            processor.clone(),
            objects.clone(),
            cases.clone(),
        );

        TestApp {
            router: create_router(state, None),
            backend,
            processor,
            objects,
            cases,
        }
    }
}

pub fn test_app() -> TestApp {
    TestAppBuilder::new().build()
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

const BOUNDARY: &str = "urocase-test-boundary";

/// `multipart/form-data` upload with a `video` part and optional attending text.
pub fn video_upload(
    uri: &str,
    video: &[u8],
    filename: &str,
    attending: Option<&str>,
) -> Request<Body> {
    let mut body = Vec::new();
    if let Some(text) = attending {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"attendingPrompt\"\r\n\r\n{text}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"video\"; filename=\"{filename}\"\r\nContent-Type: video/mp4\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(video);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

/// Form with only a text field.
pub fn form_without_video(uri: &str) -> Request<Body> {
    let body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"attendingPrompt\"\r\n\r\nLook at the UPJ\r\n--{BOUNDARY}--\r\n"
    );
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

/// Parse an SSE body into `(event, data)` pairs.
pub fn sse_events(body: &[u8]) -> Vec<(String, serde_json::Value)> {
    let text = String::from_utf8_lossy(body);
    text.split("\n\n")
        .filter_map(|block| {
            let mut event = None;
            let mut data = None;
            for line in block.lines() {
                if let Some(name) = line.strip_prefix("event:") {
                    event = Some(name.trim().to_string());
                } else if let Some(payload) = line.strip_prefix("data:") {
                    data = serde_json::from_str(payload.trim()).ok();
                }
            }
            Some((event?, data?))
        })
        .collect()
}
