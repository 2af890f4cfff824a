//! Storage for UroCase.
//!
//! This crate provides:
//! - Cloudflare R2 object storage for transcoded case videos
//! - An in-memory object store for development and tests
//! - HTTP byte-range handling for video playback
//! - Case and chat transcript repositories

pub mod cases;
pub mod client;
pub mod error;
pub mod keys;
pub mod object_store;

pub use cases::{CaseRepository, InMemoryCaseRepository};
pub use client::{R2Client, R2Config};
pub use error::{StorageError, StorageResult};
pub use keys::{is_video_key, new_video_key, video_key};
pub use object_store::{ByteRange, MemoryObjectStore, ObjectRange, ObjectStore};
