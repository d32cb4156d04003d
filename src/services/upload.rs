//! Video upload adapter (YouTube resumable upload).

use super::retry::{retry_rate_limited, RetryPolicy};
use super::{AdapterOutcome, ServiceError};
use crate::config::{VideoConfig, YoutubeSettings};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// "People & Blogs"
const DEFAULT_CATEGORY_ID: u32 = 22;
const DEFAULT_PRIVACY_STATUS: &str = "private";

/// Metadata attached to an uploaded video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: u32,
    pub privacy_status: String,
}

impl UploadMetadata {
    /// Build metadata from a video configuration, deriving anything not set.
    pub fn from_config(config: &VideoConfig) -> Self {
        let output = &config.output;
        let topic = &config.prompt.topic;

        Self {
            title: output
                .title
                .clone()
                .unwrap_or_else(|| format!("{} - {} | Motivational Video", topic, config.theme)),
            description: output.description.clone().unwrap_or_else(|| {
                format!(
                    "A motivational video about {} with a focus on {}.",
                    config.theme, topic
                )
            }),
            tags: output.tags.clone().unwrap_or_else(|| {
                vec![
                    config.niche.clone(),
                    config.theme.clone(),
                    topic.clone(),
                    "motivation".to_string(),
                    "inspiration".to_string(),
                ]
            }),
            category_id: output.category_id.unwrap_or(DEFAULT_CATEGORY_ID),
            privacy_status: output
                .privacy_status
                .clone()
                .unwrap_or_else(|| DEFAULT_PRIVACY_STATUS.to_string()),
        }
    }
}

/// A video hosting service.
#[async_trait]
pub trait UploadBackend: Send + Sync {
    /// Upload `video` and return the hosted video id.
    async fn upload(&self, video: &Path, metadata: &UploadMetadata) -> std::result::Result<String, ServiceError>;
}

/// YouTube Data API uploader using a pre-issued OAuth access token.
pub struct YoutubeUploader {
    http: reqwest::Client,
    upload_url: String,
    access_token: String,
}

impl YoutubeUploader {
    pub fn new(upload_url: &str, access_token: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            upload_url: upload_url.to_string(),
            access_token: access_token.to_string(),
        })
    }

    /// Build an uploader if the access token variable is set.
    pub fn from_settings(settings: &YoutubeSettings) -> Result<Option<Self>> {
        match std::env::var(&settings.access_token_env) {
            Ok(token) if !token.trim().is_empty() => Ok(Some(Self::new(
                &settings.upload_url,
                token.trim(),
                Duration::from_secs(settings.request_timeout_secs),
            )?)),
            _ => Ok(None),
        }
    }

    /// Open a resumable session and return its upload URL.
    async fn start_session(&self, metadata: &UploadMetadata, size: u64) -> std::result::Result<String, ServiceError> {
        let body = json!({
            "snippet": {
                "title": metadata.title,
                "description": metadata.description,
                "tags": metadata.tags,
                "categoryId": metadata.category_id.to_string(),
            },
            "status": { "privacyStatus": metadata.privacy_status }
        });

        let response = self
            .http
            .post(&self.upload_url)
            .query(&[("uploadType", "resumable"), ("part", "snippet,status")])
            .bearer_auth(&self.access_token)
            .header("X-Upload-Content-Type", "video/*")
            .header("X-Upload-Content-Length", size.to_string())
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ServiceError::classify(Some(status.as_u16()), text));
        }

        response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| ServiceError::Unavailable("upload session has no location".to_string()))
    }
}

#[async_trait]
impl UploadBackend for YoutubeUploader {
    async fn upload(&self, video: &Path, metadata: &UploadMetadata) -> std::result::Result<String, ServiceError> {
        let bytes = tokio::fs::read(video)
            .await
            .map_err(|e| ServiceError::Fatal(format!("cannot read {}: {}", video.display(), e)))?;

        let session = self.start_session(metadata, bytes.len() as u64).await?;

        let response = self
            .http
            .put(&session)
            .bearer_auth(&self.access_token)
            .header(reqwest::header::CONTENT_TYPE, "video/*")
            .body(bytes)
            .send()
            .await
            .map_err(|e| ServiceError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ServiceError::classify(Some(status.as_u16()), text));
        }

        #[derive(Deserialize)]
        struct Uploaded {
            id: String,
        }
        let uploaded: Uploaded = response
            .json()
            .await
            .map_err(|e| ServiceError::Unavailable(format!("unexpected upload response: {}", e)))?;
        Ok(uploaded.id)
    }
}

/// Watch URL for a hosted video id.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Upload with rate-limit backoff. Every failure is non-fatal.
#[derive(Clone)]
pub struct UploadAdapter {
    backend: Arc<dyn UploadBackend>,
    policy: RetryPolicy,
}

impl UploadAdapter {
    pub fn new(backend: Arc<dyn UploadBackend>, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    /// Upload `video`; yields the watch URL, or `None` with a reason on failure.
    pub async fn upload(&self, video: &Path, metadata: &UploadMetadata) -> AdapterOutcome<Option<String>> {
        info!("Uploading {} as \"{}\"", video.display(), metadata.title);

        let backend = &self.backend;
        match retry_rate_limited(&self.policy, || backend.upload(video, metadata)).await {
            Ok(id) => AdapterOutcome::Success(Some(watch_url(&id))),
            Err(e) => {
                warn!("Upload failed: {}", e);
                AdapterOutcome::Degraded {
                    value: None,
                    reason: e.to_string(),
                }
            }
        }
    }
}
