//! Multimodal inference client for CT teaching-case analysis.
//!
//! This crate provides:
//! - The `VisionBackend` trait the analysis layer is written against
//! - A Gemini `generateContent` client (images, inline video, chat turns)
//! - Incremental SSE parsing for streamed video analysis

pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod sse;
mod types;


pub use backend::{ChatTurn, InlineImage, VisionBackend};
pub use client::GeminiClient;
pub use config::VisionConfig;
pub use error::{InferenceError, InferenceResult};
pub use sse::{text_stream, SseLineBuffer, TextStream};
