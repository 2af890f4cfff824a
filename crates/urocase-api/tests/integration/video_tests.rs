//! Video analysis, SSE streaming and range playback.

use std::sync::atomic::Ordering;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use urocase_analysis::AnalysisConfig;
use urocase_models::{AnalysisMode, MediaType, NewCase};
use urocase_storage::{CaseRepository, ObjectStore};

use crate::support::{
    body_bytes, body_json, form_without_video, get, sse_events, test_app, video_upload,
    TestAppBuilder, EXPLANATION, TITLE,
};

const CLIP: &[u8] = b"\x00\x00\x00\x18ftypmp42 axial ct scroll clip";

fn analysis(mode: AnalysisMode) -> AnalysisConfig {
    AnalysisConfig::default().with_mode(mode)
}

/// Test native analysis drafts a case and stores the compressed video
#[tokio::test]
async fn test_analyze_video_native() {
    let app = test_app();

    let response = app
        .send(video_upload("/api/ai/analyze-video", CLIP, "axial.mp4", Some("Check the left UPJ")))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["explanation"], EXPLANATION);
    assert_eq!(body["title"], TITLE);
    assert_eq!(body["category"], "Stones");
    assert_eq!(body["strategy"], "native");
    assert_eq!(body["framesExtracted"], 0);
    assert_eq!(body["mediaType"], "video");
    assert_eq!(body["thumbnail"], "data:image/jpeg;base64,thumb");
    assert_eq!(body["videoInfo"]["width"], 1920);
    assert_eq!(body["videoInfo"]["duration"], 12.0);

    let key = body["videoUrl"].as_str().unwrap();
    assert!(key.starts_with("videos/") && key.ends_with(".mp4"));
    let stored = app.objects.get(key).await.unwrap();
    assert_eq!(stored.len(), CLIP.len() / 2);
    assert_eq!(app.processor.compress_calls.load(Ordering::SeqCst), 1);
}

/// Test a native failure falls back to frame extraction
#[tokio::test]
async fn test_analyze_video_falls_back_to_frames() {
    let app = TestAppBuilder::new().failing_native().build();

    let response = app
        .send(video_upload("/api/ai/analyze-video", CLIP, "axial.mp4", None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["strategy"], "frames");
    assert_eq!(body["framesExtracted"], 10);
    assert!(body["thumbnail"]
        .as_str()
        .unwrap()
        .starts_with("data:image/jpeg;base64,frame-"));
    assert_eq!(app.backend.video_calls.load(Ordering::SeqCst), 1);
    assert_eq!(app.backend.image_calls.load(Ordering::SeqCst), 1);
}

/// Test native-only mode surfaces the upstream failure and stores nothing
#[tokio::test]
async fn test_analyze_video_native_only_failure() {
    let app = TestAppBuilder::new()
        .analysis(analysis(AnalysisMode::Native))
        .failing_native()
        .build();

    let response = app
        .send(video_upload("/api/ai/analyze-video", CLIP, "axial.mp4", None))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["code"], "analysis_failed");

    assert_eq!(app.backend.image_calls.load(Ordering::SeqCst), 0);
    assert_eq!(app.processor.compress_calls.load(Ordering::SeqCst), 0);
    assert!(app.objects.is_empty().await);
}

/// Test production hides upstream failure details but keeps the code
#[tokio::test]
async fn test_production_masks_upstream_failure() {
    let app = TestAppBuilder::new()
        .analysis(analysis(AnalysisMode::Native))
        .failing_native()
        .production()
        .build();

    let response = app
        .send(video_upload("/api/ai/analyze-video", CLIP, "axial.mp4", None))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(response).await;
    assert_eq!(body["detail"], "An internal error occurred");
    assert_eq!(body["code"], "analysis_failed");
}

/// Test production still explains compression failures to the uploader
#[tokio::test]
async fn test_production_keeps_actionable_detail() {
    let app = TestAppBuilder::new().failing_compression().production().build();

    let response = app
        .send(video_upload("/api/ai/analyze-video", CLIP, "axial.mp4", None))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert!(body["detail"].as_str().unwrap().contains("shorter clip"));
}

/// Test native-only mode rejects videos over the inline cap
#[tokio::test]
async fn test_analyze_video_native_only_too_large() {
    let config = AnalysisConfig {
        inline_cap_bytes: 8,
        ..analysis(AnalysisMode::Native)
    };
    let app = TestAppBuilder::new().analysis(config).build();

    let response = app
        .send(video_upload("/api/ai/analyze-video", CLIP, "axial.mp4", None))
        .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body_json(response).await["code"], "native_too_large");
    assert_eq!(app.backend.video_calls.load(Ordering::SeqCst), 0);
}

/// Test a compression failure leaves storage untouched
#[tokio::test]
async fn test_analyze_video_compression_failure() {
    let app = TestAppBuilder::new().failing_compression().build();

    let response = app
        .send(video_upload("/api/ai/analyze-video", CLIP, "axial.mp4", None))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["code"], "compression_failed");
    assert!(app.objects.is_empty().await);
}

/// Test missing and empty uploads are rejected
#[tokio::test]
async fn test_analyze_video_requires_file() {
    let app = test_app();

    let response = app.send(form_without_video("/api/ai/analyze-video")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["detail"],
        "Bad request: No video file provided"
    );

    let response = app
        .send(video_upload("/api/ai/analyze-video", b"", "axial.mp4", None))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["detail"],
        "Bad request: Video file is empty"
    );
    assert_eq!(app.backend.video_calls.load(Ordering::SeqCst), 0);
}

/// Test unreadable uploads fail at probe time
#[tokio::test]
async fn test_probe_upload() {
    let app = test_app();

    let response = app
        .send(video_upload("/api/media/probe", CLIP, "axial.mp4", None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send(video_upload("/api/media/probe", b"garbage bytes", "axial.mp4", None))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(response).await["code"], "probe_failed");
}

/// Test streamed chunks concatenate to the full explanation
#[tokio::test]
async fn test_stream_native_chunks_then_complete() {
    let app = test_app();

    let response = app
        .send(video_upload("/api/ai/analyze-video/stream", CLIP, "axial.mp4", None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    let events = sse_events(&body_bytes(response).await);
    let (last, chunks) = events.split_last().unwrap();

    assert!(chunks.len() > 1);
    assert!(chunks.iter().all(|(name, _)| name == "chunk"));
    let text: String = chunks
        .iter()
        .map(|(_, data)| data["text"].as_str().unwrap())
        .collect();
    assert_eq!(text, EXPLANATION);

    assert_eq!(last.0, "complete");
    assert_eq!(last.1["strategy"], "native");
    assert_eq!(last.1["thumbnail"], "data:image/jpeg;base64,thumb");
}

/// Test oversized videos stream as one frame-analysis chunk
#[tokio::test]
async fn test_stream_falls_back_for_large_video() {
    let config = AnalysisConfig {
        inline_cap_bytes: 8,
        ..AnalysisConfig::default()
    };
    let app = TestAppBuilder::new().analysis(config).build();

    let response = app
        .send(video_upload("/api/ai/analyze-video/stream", CLIP, "axial.mp4", None))
        .await;
    let events = sse_events(&body_bytes(response).await);

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].0, "chunk");
    assert_eq!(events[0].1["text"], EXPLANATION);
    assert_eq!(events[1].0, "complete");
    assert_eq!(events[1].1["strategy"], "frames");
    assert_eq!(app.backend.video_calls.load(Ordering::SeqCst), 0);
}

/// Test a stream that cannot start falls back to whole-video analysis
#[tokio::test]
async fn test_stream_start_failure_falls_back() {
    let app = TestAppBuilder::new().failing_native().build();

    let response = app
        .send(video_upload("/api/ai/analyze-video/stream", CLIP, "axial.mp4", None))
        .await;
    let events = sse_events(&body_bytes(response).await);

    let names: Vec<&str> = events.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["chunk", "complete"]);
    assert_eq!(events[1].1["strategy"], "frames");
}

/// Test native-only streaming reports the failure as an error event
#[tokio::test]
async fn test_stream_native_only_error_event() {
    let app = TestAppBuilder::new()
        .analysis(analysis(AnalysisMode::Native))
        .failing_native()
        .build();

    let response = app
        .send(video_upload("/api/ai/analyze-video/stream", CLIP, "axial.mp4", None))
        .await;
    let events = sse_events(&body_bytes(response).await);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, "error");
    assert_eq!(events[0].1["code"], "analysis_failed");
}

/// Test streamed error events follow the same masking as JSON errors
#[tokio::test]
async fn test_stream_error_event_masked_in_production() {
    let app = TestAppBuilder::new()
        .analysis(analysis(AnalysisMode::Native))
        .failing_native()
        .production()
        .build();

    let response = app
        .send(video_upload("/api/ai/analyze-video/stream", CLIP, "axial.mp4", None))
        .await;
    let events = sse_events(&body_bytes(response).await);

    assert_eq!(events[0].0, "error");
    assert_eq!(events[0].1["detail"], "An internal error occurred");
}

async fn video_case(app: &crate::support::TestApp, bytes: &[u8]) -> String {
    let key = "videos/00000000-0000-0000-0000-00000000000a.mp4";
    app.objects
        .put(key, bytes.to_vec(), "video/mp4")
        .await
        .unwrap();
    let case = app
        .cases
        .create_case(NewCase {
            title: "Renal Laceration".to_string(),
            image_url: "data:image/jpeg;base64,thumb".to_string(),
            explanation: EXPLANATION.to_string(),
            category: "Trauma".to_string(),
            attending_prompt: None,
            video_url: Some(key.to_string()),
            media_type: MediaType::Video,
        })
        .await
        .unwrap();
    case.id.to_string()
}

/// Test range requests return 206 with Content-Range
#[tokio::test]
async fn test_video_stream_range() {
    let app = test_app();
    let id = video_case(&app, b"0123456789").await;
    let uri = format!("/api/videos/{}/stream", id);

    let response = app
        .send(
            Request::builder()
                .uri(&uri)
                .header("Range", "bytes=2-5")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()["content-range"], "bytes 2-5/10");
    assert_eq!(response.headers()["accept-ranges"], "bytes");
    assert_eq!(response.headers()["cross-origin-resource-policy"], "cross-origin");
    assert_eq!(body_bytes(response).await, b"2345");

    let response = app.send(get(&uri)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "video/mp4");
    assert_eq!(body_bytes(response).await, b"0123456789");

    let response = app
        .send(
            Request::builder()
                .uri(&uri)
                .header("Range", "bytes=20-")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
}

/// Test playback of cases without a video
#[tokio::test]
async fn test_video_stream_missing() {
    let app = test_app();

    let response = app.send(get("/api/videos/unknown/stream")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let create = crate::support::json_request(
        "POST",
        "/api/cases",
        json!({
            "title": "Horseshoe Kidney",
            "imageUrl": "data:image/jpeg;base64,aGVsbG8=",
            "explanation": EXPLANATION,
            "category": "Congenital",
        }),
    );
    let case = body_json(app.send(create).await).await;
    let response = app
        .send(get(&format!("/api/videos/{}/stream", case["id"].as_str().unwrap())))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await["detail"],
        "Not found: Case has no video"
    );
}
