//! Shared data models for the UroCase backend.
//!
//! This crate provides Serde-serializable types for:
//! - Uploaded video blobs and probed metadata
//! - Extracted still frames
//! - Analysis modes, strategies and results
//! - Teaching cases and their chat transcripts
//! - Compression ladder configuration

pub mod analysis;
pub mod case;
pub mod encoding;
pub mod frame;
pub mod video;

// Re-export common types
pub use analysis::{AnalysisMode, AnalysisResult, AnalysisStrategyName};
pub use case::{
    Case, CaseCategory, CaseId, CaseUpdate, ChatMessage, ChatRole, MediaType, NewCase,
    NewChatMessage,
};
pub use encoding::{CompressionConfig, CompressionRung};
pub use frame::{ExtractedFrame, ImageFormat};
pub use video::{mime_type_for_filename, VideoBlob, VideoMetadata};
