//! Axum HTTP API server for UroCase.
//!
//! This crate provides:
//! - Teaching case and chat transcript CRUD
//! - Image and CT video analysis, with SSE streaming for video
//! - Range-aware playback of stored case videos
//! - Rate limiting, security headers and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
