//! Video analysis strategy layer for CT teaching cases.
//!
//! This crate provides:
//! - The native / frame-extraction strategy selector and its decision table
//! - Streaming preparation for native video analysis
//! - Fixed five-part teaching prompts
//! - Case authoring helpers (image explanation, title, category, chat, refine)

pub mod config;
pub mod error;
pub mod prompts;
pub mod selector;
pub mod strategy;
pub mod teaching;

#[cfg(test)]
mod test_support;

pub use config::{AnalysisConfig, DEFAULT_FRAME_COUNT, INLINE_CAP_BYTES};
pub use error::{AnalysisError, AnalyzeResult};
pub use selector::{AnalysisSelector, StreamingPayload};
pub use strategy::{Strategy, StrategyContext};
pub use teaching::TeachingAssistant;
