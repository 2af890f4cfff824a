//! Per-call scratch directories for external tool invocations.
//!
//! Every probe, extraction and transcode gets its own uniquely named
//! directory. The directory is owned by a [`ScratchDir`] and removed when
//! that value is dropped, so early returns, errors, panics and cancelled
//! futures all clean up. Concurrent calls never share a directory.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};
use urocase_models::VideoBlob;

use crate::error::MediaResult;

/// A temporary working directory removed on drop.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    /// Create a fresh directory under the system temp dir, named `<prefix><random>`.
    pub fn new(prefix: &str) -> MediaResult<Self> {
        let dir = tempfile::Builder::new().prefix(prefix).tempdir()?;
        debug!(path = %dir.path().display(), "Created scratch directory");
        Ok(Self { dir })
    }

    /// Directory path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of a file inside the directory.
    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write the blob into the directory as `input.<ext>` and return its path.
    pub async fn materialize(&self, video: &VideoBlob) -> MediaResult<PathBuf> {
        let ext = video.extension().unwrap_or_else(|| "mp4".to_string());
        let path = self.join(format!("input.{}", ext));
        tokio::fs::write(&path, video.bytes()).await?;
        Ok(path)
    }

    /// Remove the directory now, logging instead of failing on cleanup errors.
    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            warn!(path = %path.display(), error = %e, "Failed to remove scratch directory");
        }
    }
}
