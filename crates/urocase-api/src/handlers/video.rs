//! CT video analysis: whole-response and SSE streaming.

use std::convert::Infallible;
use std::time::Instant;

use axum::extract::{Multipart, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures_util::stream::{self, Stream};
use futures_util::StreamExt;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};
use urocase_analysis::AnalysisError;
use urocase_models::{AnalysisMode, AnalysisStrategyName, MediaType, VideoBlob, VideoMetadata};
use urocase_storage::new_video_key;
use urocase_vision::TextStream;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

const VIDEO_FIELD: &str = "video";
const ATTENDING_FIELD: &str = "attendingPrompt";
const DEFAULT_UPLOAD_NAME: &str = "upload.mp4";

/// A video upload and its optional attending guidance.
pub(crate) struct VideoUpload {
    pub video: VideoBlob,
    pub attending: Option<String>,
}

/// Read the `video` file and `attendingPrompt` text fields.
pub(crate) async fn read_video_form(mut multipart: Multipart) -> ApiResult<VideoUpload> {
    let mut video = None;
    let mut attending = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            VIDEO_FIELD => {
                let filename = field
                    .file_name()
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or(DEFAULT_UPLOAD_NAME)
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;
                video = Some(VideoBlob::new(bytes.to_vec(), filename));
            }
            ATTENDING_FIELD => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;
                attending = Some(text).filter(|t| !t.trim().is_empty());
            }
            other => debug!(field = %other, "Ignoring multipart field"),
        }
    }

    let video = video.ok_or_else(|| ApiError::bad_request("No video file provided"))?;
    if video.size_bytes() == 0 {
        return Err(ApiError::bad_request("Video file is empty"));
    }

    info!(
        filename = %video.filename(),
        size_mb = format!("{:.2}", video.size_mb()),
        has_attending = attending.is_some(),
        "Received video upload"
    );
    Ok(VideoUpload { video, attending })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoAnalysisResponse {
    pub explanation: String,
    pub title: String,
    pub category: String,
    /// Thumbnail data URL
    pub thumbnail: String,
    /// Object key of the stored, transcoded video
    pub video_url: String,
    pub strategy: AnalysisStrategyName,
    /// Frames sent to the model; 0 when the whole video was sent inline
    pub frames_extracted: usize,
    pub video_info: VideoMetadata,
    pub media_type: MediaType,
}

/// Analyze an uploaded CT video and store its transcoded copy.
///
/// The video is written to object storage only after analysis succeeds.
pub async fn analyze_video(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<VideoAnalysisResponse>> {
    let started = Instant::now();
    let VideoUpload { video, attending } = read_video_form(multipart).await?;

    let video_info = state.media.probe(&video).await?;
    debug!(?video_info, "Probed upload");

    let result = state.selector.analyze(&video, attending.as_deref()).await?;
    let (title, category) = state.assistant.describe(&result.explanation_text).await?;

    let compressed = state.media.compress(&video, &state.config.compression).await?;
    let key = new_video_key();
    let size = compressed.size_bytes();
    state.objects.put(&key, compressed.into_bytes(), "video/mp4").await?;
    metrics::record_video_upload(size);

    let frames_extracted = match result.strategy_used {
        AnalysisStrategyName::Frames => state.selector.config().frame_count,
        AnalysisStrategyName::Native => 0,
    };

    info!(
        filename = %video.filename(),
        strategy = %result.strategy_used,
        key = %key,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Video case drafted"
    );

    Ok(Json(VideoAnalysisResponse {
        explanation: result.explanation_text,
        title,
        category: category.to_string(),
        thumbnail: result.thumbnail_data_url,
        video_url: key,
        strategy: result.strategy_used,
        frames_extracted,
        video_info,
        media_type: MediaType::Video,
    }))
}

enum Stage {
    Start,
    Chunks(TextStream),
    Complete {
        thumbnail: Option<String>,
        strategy: AnalysisStrategyName,
    },
    Finished,
}

/// One SSE analysis session. Dropping it drops the upstream body.
struct StreamSession {
    state: AppState,
    video: VideoBlob,
    attending: Option<String>,
    stage: Stage,
}

fn chunk_event(text: &str) -> Event {
    metrics::record_stream_chunk();
    Event::default()
        .event("chunk")
        .data(json!({ "text": text }).to_string())
}

fn complete_event(thumbnail: &str, strategy: AnalysisStrategyName) -> Event {
    Event::default()
        .event("complete")
        .data(json!({ "thumbnail": thumbnail, "strategy": strategy }).to_string())
}

impl StreamSession {
    fn error_event(&self, err: ApiError) -> Event {
        warn!(code = err.code(), error = %err, "Streaming analysis failed");
        let detail = err.public_detail(self.state.config.is_production());
        Event::default()
            .event("error")
            .data(json!({ "detail": detail, "code": err.code() }).to_string())
    }

    /// Whole-response analysis delivered as a single chunk.
    async fn run_whole(&mut self) -> Event {
        metrics::record_stream_session(false);
        match self.state.selector.analyze(&self.video, self.attending.as_deref()).await {
            Ok(result) => {
                self.stage = Stage::Complete {
                    thumbnail: Some(result.thumbnail_data_url),
                    strategy: result.strategy_used,
                };
                chunk_event(&result.explanation_text)
            }
            Err(e) => self.error_event(e.into()),
        }
    }

    async fn start(&mut self) -> Option<Event> {
        let selector = self.state.selector.clone();
        let payload = match selector.prepare_streaming(&self.video, self.attending.as_deref()) {
            Ok(payload) => payload,
            Err(AnalysisError::NativeUnavailable(reason)) => {
                info!(reason = %reason, "Native streaming unavailable, analyzing whole video");
                return Some(self.run_whole().await);
            }
            Err(e) => return Some(self.error_event(e.into())),
        };

        match selector.stream(&payload).await {
            Ok(upstream) => {
                metrics::record_stream_session(true);
                self.stage = Stage::Chunks(upstream);
                None
            }
            Err(e) if selector.config().mode == AnalysisMode::NativeWithFallback => {
                warn!(error = %e, "Native stream failed to start, falling back");
                Some(self.run_whole().await)
            }
            Err(e) => Some(self.error_event(e.into())),
        }
    }

    async fn next_event(&mut self) -> Option<Event> {
        loop {
            match std::mem::replace(&mut self.stage, Stage::Finished) {
                Stage::Start => {
                    if let Some(event) = self.start().await {
                        return Some(event);
                    }
                }
                Stage::Chunks(mut upstream) => match upstream.next().await {
                    Some(Ok(text)) => {
                        self.stage = Stage::Chunks(upstream);
                        return Some(chunk_event(&text));
                    }
                    Some(Err(e)) => return Some(self.error_event(e.into())),
                    None => {
                        self.stage = Stage::Complete {
                            thumbnail: None,
                            strategy: AnalysisStrategyName::Native,
                        };
                    }
                },
                Stage::Complete { thumbnail, strategy } => {
                    let thumbnail = match thumbnail {
                        Some(t) => t,
                        None => match self.state.selector.thumbnail_for(&self.video).await {
                            Ok(t) => t,
                            Err(e) => return Some(self.error_event(e.into())),
                        },
                    };
                    info!(strategy = %strategy, "Streaming analysis complete");
                    return Some(complete_event(&thumbnail, strategy));
                }
                Stage::Finished => return None,
            }
        }
    }
}

/// Stream the explanation as SSE: `chunk` events in order, then `complete`
/// with the thumbnail, or `error`.
pub async fn analyze_video_stream(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let VideoUpload { video, attending } = read_video_form(multipart).await?;

    let session = StreamSession {
        state,
        video,
        attending,
        stage: Stage::Start,
    };
    let events = stream::unfold(session, |mut session| async move {
        let event = session.next_event().await?;
        Some((Ok(event), session))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
