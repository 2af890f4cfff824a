//! Video probing and range-aware playback of stored case videos.

use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use axum::Json;
use urocase_models::{CaseId, VideoMetadata};
use urocase_storage::{ByteRange, StorageError};

use crate::error::{ApiError, ApiResult};
use crate::handlers::video::{read_video_form, VideoUpload};
use crate::state::AppState;

/// Duration, resolution and frame rate of an uploaded video.
pub async fn probe_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<VideoMetadata>> {
    let VideoUpload { video, .. } = read_video_form(multipart).await?;
    Ok(Json(state.media.probe(&video).await?))
}

/// Stream a case's stored video, honouring a single `Range` request.
pub async fn stream_case_video(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let case = state
        .cases
        .get_case(&CaseId::from(case_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Case not found"))?;
    let key = case
        .video_url
        .ok_or_else(|| ApiError::not_found("Case has no video"))?;

    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(ByteRange::parse)
        .transpose()?;

    let object = state.objects.get_range(&key, range).await.map_err(|e| match e {
        StorageError::NotFound(_) => ApiError::not_found("Video not found"),
        other => ApiError::Storage(other),
    })?;

    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, object.content_type.as_str())
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_LENGTH, object.bytes.len())
        .header(header::CACHE_CONTROL, "private, max-age=3600")
        .header("Cross-Origin-Resource-Policy", "cross-origin");

    builder = if object.partial {
        builder
            .status(StatusCode::PARTIAL_CONTENT)
            .header(header::CONTENT_RANGE, object.content_range())
    } else {
        builder.status(StatusCode::OK)
    };

    builder
        .body(Body::from(object.bytes))
        .map_err(|e| ApiError::internal(format!("Failed to build response: {}", e)))
}
