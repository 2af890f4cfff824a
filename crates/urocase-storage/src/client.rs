//! R2 client implementation.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::object_store::{ByteRange, ObjectRange, ObjectStore};

/// Configuration for R2 client.
#[derive(Clone)]
pub struct R2Config {
    /// R2 endpoint URL (S3 API endpoint)
    pub endpoint_url: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    /// Region (usually "auto" for R2)
    pub region: String,
}

impl R2Config {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        let var = |name: &str| {
            std::env::var(name).map_err(|_| StorageError::config_error(format!("{} not set", name)))
        };
        Ok(Self {
            endpoint_url: var("R2_ENDPOINT_URL")?,
            access_key_id: var("R2_ACCESS_KEY_ID")?,
            secret_access_key: var("R2_SECRET_ACCESS_KEY")?,
            bucket_name: var("R2_BUCKET_NAME")?,
            region: std::env::var("R2_REGION").unwrap_or_else(|_| "auto".to_string()),
        })
    }
}

impl std::fmt::Debug for R2Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("R2Config")
            .field("endpoint_url", &self.endpoint_url)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("bucket_name", &self.bucket_name)
            .field("region", &self.region)
            .finish()
    }
}

/// Cloudflare R2 storage client.
#[derive(Clone)]
pub struct R2Client {
    client: Client,
    bucket: String,
}

impl R2Client {
    pub fn new(config: R2Config) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "r2",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        info!(bucket = %config.bucket_name, "R2 client configured");
        Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket_name,
        }
    }

    pub fn from_env() -> StorageResult<Self> {
        Ok(Self::new(R2Config::from_env()?))
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Upload bytes to R2.
    pub async fn upload_bytes(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()> {
        debug!("Uploading {} bytes to {}", data.len(), key);
        let size = data.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        info!(key = %key, bytes = size, "Uploaded object");
        Ok(())
    }

    /// Download object as bytes.
    pub async fn download_bytes(&self, key: &str) -> StorageResult<Vec<u8>> {
        debug!("Downloading {}", key);

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| download_error(key, e))?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(bytes)
    }

    /// Get object with an optional byte range.
    pub async fn get_object_range(
        &self,
        key: &str,
        range: Option<ByteRange>,
    ) -> StorageResult<ObjectRange> {
        let mut request = self.client.get_object().bucket(&self.bucket).key(key);
        if let Some(range) = range {
            request = request.range(range.to_header());
        }

        let response = request.send().await.map_err(|e| download_error(key, e))?;

        let content_length = response.content_length().unwrap_or(0).max(0) as u64;
        let content_type = response
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let content_range = response.content_range().map(str::to_string);

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?
            .into_bytes()
            .to_vec();

        let (start, end, total_size, partial) = match (range, content_range.as_deref()) {
            (Some(range), Some(header)) => {
                let total = total_from_content_range(header).unwrap_or(content_length);
                let (start, end) = range.resolve(total)?;
                (start, end, total, true)
            }
            _ => (0, content_length.saturating_sub(1), content_length, false),
        };

        Ok(ObjectRange {
            bytes,
            content_type,
            start,
            end,
            total_size,
            partial,
        })
    }

    pub async fn delete_object(&self, key: &str) -> StorageResult<()> {
        debug!("Deleting {}", key);

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::delete_failed(e.to_string()))?;

        Ok(())
    }

    /// Check if an object exists.
    pub async fn exists(&self, key: &str) -> StorageResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.to_string().contains("NotFound") || e.to_string().contains("NoSuchKey") {
                    Ok(false)
                } else {
                    Err(StorageError::AwsSdk(e.to_string()))
                }
            }
        }
    }

    /// Check connectivity to R2 by performing a head bucket operation.
    pub async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| StorageError::AwsSdk(format!("R2 connectivity check failed: {}", e)))?;
        Ok(())
    }
}

fn download_error(key: &str, e: impl std::fmt::Display) -> StorageError {
    let msg = e.to_string();
    if msg.contains("NoSuchKey") {
        StorageError::not_found(key)
    } else if msg.contains("InvalidRange") {
        StorageError::invalid_range(msg)
    } else {
        StorageError::DownloadFailed(msg)
    }
}

/// Total size from a `Content-Range: bytes a-b/total` response header.
fn total_from_content_range(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

#[async_trait]
impl ObjectStore for R2Client {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()> {
        self.upload_bytes(key, data, content_type).await
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.download_bytes(key).await
    }

    async fn get_range(&self, key: &str, range: Option<ByteRange>) -> StorageResult<ObjectRange> {
        self.get_object_range(key, range).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.delete_object(key).await
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        R2Client::exists(self, key).await
    }

    async fn check_connectivity(&self) -> StorageResult<()> {
        R2Client::check_connectivity(self).await
    }
}
