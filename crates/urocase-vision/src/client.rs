//! Gemini `generateContent` client.

use std::time::Instant;

use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::{Client, Response};
use tracing::{debug, info, warn};
use urocase_models::ChatRole;

use crate::backend::{ChatTurn, InlineImage, VisionBackend};
use crate::config::VisionConfig;
use crate::error::{InferenceError, InferenceResult};
use crate::sse::{text_stream, TextStream};
use crate::types::{Content, GenerateContentRequest, GenerateContentResponse, Part};

/// Gemini API client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    config: VisionConfig,
    http: Client,
}

impl GeminiClient {
    /// Create a new Gemini client.
    ///
    /// Succeeds without credentials; calls then fail with `NotConfigured`.
    pub fn new(config: VisionConfig) -> InferenceResult<Self> {
        // No client-wide timeout: it would also cap long streamed bodies
        let http = Client::builder().build()?;
        Ok(Self { config, http })
    }

    /// Create a client from `GEMINI_*` environment variables.
    pub fn from_env() -> InferenceResult<Self> {
        Self::new(VisionConfig::from_env())
    }

    pub fn config(&self) -> &VisionConfig {
        &self.config
    }

    fn api_key(&self) -> InferenceResult<&str> {
        self.config
            .api_key
            .as_deref()
            .ok_or(InferenceError::NotConfigured)
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/models/{}:{}", self.config.base_url, self.config.model, method)
    }

    async fn send(&self, url: &str, request: &GenerateContentRequest) -> InferenceResult<Response> {
        let api_key = self.api_key()?;
        let timeout = self.config.request_timeout;

        let sent = self
            .http
            .post(url)
            .bearer_auth(api_key)
            .json(request)
            .send();

        let response = match tokio::time::timeout(timeout, sent).await {
            Ok(result) => result?,
            Err(_) => return Err(InferenceError::Timeout(timeout.as_secs())),
        };

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            counter!("urocase_inference_errors_total", "status" => status.to_string()).increment(1);
            warn!(status, body = %body, "Gemini API returned an error");
            return Err(InferenceError::Api { status, body });
        }

        Ok(response)
    }

    /// Call `generateContent` and return the first candidate's text.
    async fn generate(
        &self,
        kind: &'static str,
        request: GenerateContentRequest,
    ) -> InferenceResult<String> {
        let started = Instant::now();
        let url = self.endpoint("generateContent");
        let timeout = self.config.request_timeout;

        let response = self.send(&url, &request).await?;
        let body = match tokio::time::timeout(timeout, response.bytes()).await {
            Ok(result) => result?,
            Err(_) => return Err(InferenceError::Timeout(timeout.as_secs())),
        };

        let parsed: GenerateContentResponse = serde_json::from_slice(&body)
            .map_err(|e| InferenceError::parse(e.to_string()))?;
        let text = parsed.into_text();

        histogram!("urocase_inference_duration_seconds", "kind" => kind)
            .record(started.elapsed().as_secs_f64());
        debug!(
            kind,
            chars = text.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Gemini response received"
        );
        Ok(text)
    }
}

#[async_trait]
impl VisionBackend for GeminiClient {
    async fn analyze_images(
        &self,
        prompt: &str,
        images: &[InlineImage],
    ) -> InferenceResult<String> {
        info!(count = images.len(), model = %self.config.model, "Sending frames to Gemini");

        let mut parts: Vec<Part> = images
            .iter()
            .map(|img| Part::inline(img.mime_type.clone(), img.base64.clone()))
            .collect();
        parts.push(Part::text(prompt));

        self.generate("images", GenerateContentRequest::user(parts)).await
    }

    async fn analyze_video_inline(
        &self,
        prompt: &str,
        video_base64: &str,
        mime_type: &str,
    ) -> InferenceResult<String> {
        info!(
            size_mb = format!("{:.2}", encoded_size_mb(video_base64)),
            mime_type,
            model = %self.config.model,
            "Sending video to Gemini"
        );

        let parts = vec![Part::inline(mime_type, video_base64), Part::text(prompt)];
        self.generate("video", GenerateContentRequest::user(parts)).await
    }

    async fn stream_video_inline(
        &self,
        prompt: &str,
        video_base64: &str,
        mime_type: &str,
    ) -> InferenceResult<TextStream> {
        info!(
            size_mb = format!("{:.2}", encoded_size_mb(video_base64)),
            mime_type,
            model = %self.config.model,
            "Streaming video analysis from Gemini"
        );

        let url = format!("{}?alt=sse", self.endpoint("streamGenerateContent"));
        let parts = vec![Part::inline(mime_type, video_base64), Part::text(prompt)];
        let response = self.send(&url, &GenerateContentRequest::user(parts)).await?;

        counter!("urocase_inference_streams_total").increment(1);
        Ok(text_stream(response.bytes_stream(), self.config.stream_idle_timeout))
    }

    async fn converse(&self, system_prompt: &str, turns: &[ChatTurn]) -> InferenceResult<String> {
        let contents = turns
            .iter()
            .map(|turn| {
                let role = match turn.role {
                    ChatRole::User => "user",
                    ChatRole::Ai => "model",
                };
                Content::new(role, vec![Part::text(turn.content.clone())])
            })
            .collect();

        let request = GenerateContentRequest {
            contents,
            system_instruction: Some(Content::system(system_prompt)),
        };
        self.generate("chat", request).await
    }
}

/// Decoded size of a base64 payload in MiB.
fn encoded_size_mb(base64: &str) -> f64 {
    base64.len() as f64 * 0.75 / (1024.0 * 1024.0)
}
