//! Application state.

use std::sync::Arc;

use tracing::{info, warn};
use urocase_analysis::{AnalysisConfig, AnalysisSelector, TeachingAssistant};
use urocase_media::{FfmpegFrameSampler, FfmpegVideoProcessor, FrameSampler, VideoProcessor};
use urocase_storage::{
    CaseRepository, InMemoryCaseRepository, MemoryObjectStore, ObjectStore, R2Client, R2Config,
};
use urocase_vision::{GeminiClient, VisionBackend};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub cases: Arc<dyn CaseRepository>,
    pub objects: Arc<dyn ObjectStore>,
    pub media: Arc<dyn VideoProcessor>,
    pub selector: AnalysisSelector,
    pub assistant: TeachingAssistant,
}

impl AppState {
    /// Wire state from explicit collaborators.
    pub fn new(
        config: ApiConfig,
        analysis: AnalysisConfig,
        backend: Arc<dyn VisionBackend>,
        sampler: Arc<dyn FrameSampler>,
        media: Arc<dyn VideoProcessor>,
        objects: Arc<dyn ObjectStore>,
        cases: Arc<dyn CaseRepository>,
    ) -> Self {
        Self {
            config,
            cases,
            objects,
            media,
            selector: AnalysisSelector::new(analysis, backend.clone(), sampler),
            assistant: TeachingAssistant::new(backend),
        }
    }

    /// Create state from the environment.
    ///
    /// R2 is required in production; elsewhere an unconfigured bucket falls
    /// back to in-process object storage.
    pub async fn from_env(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let analysis = AnalysisConfig::from_env();
        let backend: Arc<dyn VisionBackend> = Arc::new(GeminiClient::from_env()?);

        let objects: Arc<dyn ObjectStore> = match R2Config::from_env() {
            Ok(r2) => {
                let client = R2Client::new(r2);
                if let Err(e) = client.check_connectivity().await {
                    warn!("R2 connectivity check failed at startup: {}", e);
                }
                Arc::new(client)
            }
            Err(e) if config.is_production() => return Err(e.into()),
            Err(e) => {
                warn!("{}; storing videos in memory", e);
                Arc::new(MemoryObjectStore::new())
            }
        };

        info!(
            mode = %analysis.mode,
            max_video_mb = config.compression.max_size_mb,
            "Application state ready"
        );

        Ok(Self::new(
            config,
            analysis,
            backend,
            Arc::new(FfmpegFrameSampler::default()),
            Arc::new(FfmpegVideoProcessor),
            objects,
            Arc::new(InMemoryCaseRepository::new()),
        ))
    }
}
