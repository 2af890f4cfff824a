//! Prometheus metrics for the API server.

use std::sync::OnceLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex_lite::Regex;

/// Install the Prometheus recorder and return a handle for rendering.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "urocase_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "urocase_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "urocase_http_requests_in_flight";

    // Video pipeline
    pub const VIDEO_UPLOADS_TOTAL: &str = "urocase_video_uploads_total";
    pub const VIDEO_UPLOAD_BYTES: &str = "urocase_video_upload_bytes";
    pub const STREAM_SESSIONS_TOTAL: &str = "urocase_stream_sessions_total";
    pub const STREAM_CHUNKS_TOTAL: &str = "urocase_stream_chunks_total";

    // Rate limiting
    pub const RATE_LIMIT_HITS_TOTAL: &str = "urocase_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a transcoded video written to object storage.
pub fn record_video_upload(size_bytes: u64) {
    counter!(names::VIDEO_UPLOADS_TOTAL).increment(1);
    histogram!(names::VIDEO_UPLOAD_BYTES).record(size_bytes as f64);
}

/// Record an SSE analysis session; `native` is false when it fell back to a
/// single whole-explanation chunk.
pub fn record_stream_session(native: bool) {
    let mode = if native { "native" } else { "fallback" };
    counter!(names::STREAM_SESSIONS_TOTAL, "mode" => mode).increment(1);
}

pub fn record_stream_chunk() {
    counter!(names::STREAM_CHUNKS_TOTAL).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint))];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

fn uuid_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
            .unwrap_or_else(|e| unreachable!("static pattern: {e}"))
    })
}

fn case_segment_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"/(cases|videos)/[^/:]+")
            .unwrap_or_else(|e| unreachable!("static pattern: {e}"))
    })
}

/// Sanitize path for metrics labels (collapse IDs).
fn sanitize_path(path: &str) -> String {
    let path = uuid_pattern().replace_all(path, ":id");
    case_segment_pattern()
        .replace_all(&path, "/$1/:id")
        .to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
