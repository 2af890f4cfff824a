//! Object store abstraction and HTTP byte ranges.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{StorageError, StorageResult};

/// Parsed `Range: bytes=...` request header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// `bytes=a-b`, both ends inclusive
    Bounded { start: u64, end: u64 },
    /// `bytes=a-`
    From { start: u64 },
    /// `bytes=-n`
    Suffix { len: u64 },
}

impl ByteRange {
    /// Parse a single-range header value. Multi-range requests are rejected.
    pub fn parse(header: &str) -> StorageResult<Self> {
        let spec = header
            .trim()
            .strip_prefix("bytes=")
            .ok_or_else(|| StorageError::invalid_range(header))?;
        if spec.contains(',') {
            return Err(StorageError::invalid_range("multiple ranges are not supported"));
        }

        let (start, end) = spec
            .split_once('-')
            .ok_or_else(|| StorageError::invalid_range(header))?;
        let num = |s: &str| {
            s.trim()
                .parse::<u64>()
                .map_err(|_| StorageError::invalid_range(header))
        };

        match (start.trim().is_empty(), end.trim().is_empty()) {
            (true, true) => Err(StorageError::invalid_range(header)),
            (true, false) => {
                let len = num(end)?;
                if len == 0 {
                    return Err(StorageError::invalid_range(header));
                }
                Ok(ByteRange::Suffix { len })
            }
            (false, true) => Ok(ByteRange::From { start: num(start)? }),
            (false, false) => {
                let (start, end) = (num(start)?, num(end)?);
                if end < start {
                    return Err(StorageError::invalid_range(header));
                }
                Ok(ByteRange::Bounded { start, end })
            }
        }
    }

    /// Resolve against an object of `total` bytes into inclusive `(start, end)`.
    pub fn resolve(&self, total: u64) -> StorageResult<(u64, u64)> {
        if total == 0 {
            return Err(StorageError::invalid_range("object is empty"));
        }
        let last = total - 1;
        let (start, end) = match *self {
            ByteRange::Bounded { start, end } => (start, end.min(last)),
            ByteRange::From { start } => (start, last),
            ByteRange::Suffix { len } => (total.saturating_sub(len), last),
        };
        if start > last {
            return Err(StorageError::invalid_range(format!(
                "range starts at {} but object has {} bytes",
                start, total
            )));
        }
        Ok((start, end))
    }

    /// Header form understood by S3-compatible stores.
    pub fn to_header(&self) -> String {
        match *self {
            ByteRange::Bounded { start, end } => format!("bytes={}-{}", start, end),
            ByteRange::From { start } => format!("bytes={}-", start),
            ByteRange::Suffix { len } => format!("bytes=-{}", len),
        }
    }
}

/// Bytes returned for a (possibly partial) object read.
#[derive(Debug, Clone)]
pub struct ObjectRange {
    pub bytes: Vec<u8>,
    pub content_type: String,
    /// First byte offset, inclusive
    pub start: u64,
    /// Last byte offset, inclusive
    pub end: u64,
    pub total_size: u64,
    /// Whether a range was requested and served
    pub partial: bool,
}

impl ObjectRange {
    /// `Content-Range` header value, e.g. `bytes 0-99/1000`.
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total_size)
    }
}

/// Blob storage for transcoded case videos.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()>;

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>>;

    async fn get_range(&self, key: &str, range: Option<ByteRange>) -> StorageResult<ObjectRange>;

    async fn delete(&self, key: &str) -> StorageResult<()>;

    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Cheap reachability probe for readiness checks.
    async fn check_connectivity(&self) -> StorageResult<()>;
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    content_type: String,
}

/// In-process object store for local development and tests.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()> {
        debug!("Storing {} bytes at {}", data.len(), key);
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|o| o.data.clone())
            .ok_or_else(|| StorageError::not_found(key))
    }

    async fn get_range(&self, key: &str, range: Option<ByteRange>) -> StorageResult<ObjectRange> {
        let objects = self.objects.read().await;
        let object = objects.get(key).ok_or_else(|| StorageError::not_found(key))?;
        let total = object.data.len() as u64;

        let (start, end, partial) = match range {
            Some(range) => {
                let (start, end) = range.resolve(total)?;
                (start, end, true)
            }
            None => (0, total.saturating_sub(1), false),
        };
        let bytes = if total == 0 {
            Vec::new()
        } else {
            object.data[start as usize..=end as usize].to_vec()
        };

        Ok(ObjectRange {
            bytes,
            content_type: object.content_type.clone(),
            start,
            end,
            total_size: total,
            partial,
        })
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.objects.read().await.contains_key(key))
    }

    async fn check_connectivity(&self) -> StorageResult<()> {
        Ok(())
    }
}
