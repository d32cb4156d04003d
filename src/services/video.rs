//! Video clip generation adapter.
//!
//! Clip generation is a long-running operation: the request is submitted,
//! then polled at a fixed interval until the service reports completion, and
//! finally the generated file is downloaded.

use super::retry::{call_with_rotation, RetryPolicy};
use super::{placeholder_outcome, write_artifact, AdapterOutcome, ServiceError};
use crate::keys::KeyRotator;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Parameters for one generated clip.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipRequest {
    pub prompt: String,
    pub duration_secs: u32,
    pub resolution: String,
    pub format: String,
}

impl ClipRequest {
    /// Aspect ratio derived from a `WIDTHxHEIGHT` resolution.
    pub fn aspect_ratio(&self) -> &'static str {
        let dims: Vec<u32> = self
            .resolution
            .split(['x', 'X'])
            .filter_map(|d| d.trim().parse().ok())
            .collect();
        match dims.as_slice() {
            [w, h] if w > h => "16:9",
            _ => "9:16",
        }
    }
}

/// State of a submitted generation operation.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationStatus {
    Pending,
    Done { video_uri: String },
    Failed(String),
}

/// A remote video model with long-running operations.
#[async_trait]
pub trait VideoBackend: Send + Sync {
    /// Submit a request and return the operation name.
    async fn submit(&self, api_key: &str, request: &ClipRequest) -> Result<String, ServiceError>;

    /// Check an operation.
    async fn poll(&self, api_key: &str, operation: &str) -> Result<OperationStatus, ServiceError>;

    /// Fetch a finished video.
    async fn download(&self, api_key: &str, uri: &str) -> Result<Vec<u8>, ServiceError>;
}

/// Clip generation with key rotation, bounded polling and placeholder fallback.
#[derive(Clone)]
pub struct VideoAdapter {
    backend: Arc<dyn VideoBackend>,
    rotator: Arc<KeyRotator>,
    policy: RetryPolicy,
}

impl VideoAdapter {
    pub fn new(backend: Arc<dyn VideoBackend>, rotator: Arc<KeyRotator>, policy: RetryPolicy) -> Self {
        Self {
            backend,
            rotator,
            policy,
        }
    }

    /// Generate one clip into `dest`.
    #[instrument(skip(self, request), fields(dest = %dest.display()))]
    pub async fn generate_clip(&self, request: &ClipRequest, dest: &Path) -> AdapterOutcome<PathBuf> {
        info!("Generating video with prompt: {}", request.prompt);

        match self.fetch_clip(request).await {
            Ok(bytes) => match write_artifact(dest, &bytes).await {
                Ok(path) => {
                    info!("Video saved to {}", path.display());
                    AdapterOutcome::Success(path)
                }
                Err(e) => AdapterOutcome::Fatal(format!("Failed to write clip to {}: {}", dest.display(), e)),
            },
            Err(ServiceError::Fatal(reason)) => AdapterOutcome::Fatal(reason),
            Err(e) => {
                warn!("Video generation failed: {}", e);
                placeholder_outcome(dest, e.to_string()).await
            }
        }
    }

    async fn fetch_clip(&self, request: &ClipRequest) -> Result<Vec<u8>, ServiceError> {
        let backend = &self.backend;
        let (key, operation) = call_with_rotation(&self.rotator, &self.policy, |key| async move {
            let operation = backend.submit(&key, request).await?;
            Ok((key, operation))
        })
        .await?;

        debug!("Submitted operation {}", operation);

        let video_uri = match self.policy.poll_timeout {
            Some(limit) => tokio::time::timeout(limit, self.wait_for(&key, &operation))
                .await
                .map_err(|_| {
                    ServiceError::Unavailable(format!(
                        "operation {} did not finish within {}s",
                        operation,
                        limit.as_secs()
                    ))
                })??,
            None => self.wait_for(&key, &operation).await?,
        };

        // The operation is bound to the key that created it.
        let bytes = backend.download(&key, &video_uri).await?;
        if bytes.is_empty() {
            return Err(ServiceError::Unavailable("downloaded video is empty".to_string()));
        }
        Ok(bytes)
    }

    /// Poll until the operation is done.
    async fn wait_for(&self, key: &str, operation: &str) -> Result<String, ServiceError> {
        let mut consecutive_errors = 0u32;
        loop {
            tokio::time::sleep(self.policy.poll_interval).await;

            match self.backend.poll(key, operation).await {
                Ok(OperationStatus::Done { video_uri }) => return Ok(video_uri),
                Ok(OperationStatus::Pending) => {
                    consecutive_errors = 0;
                    debug!("Operation {} still running", operation);
                }
                Ok(OperationStatus::Failed(reason)) => {
                    return Err(ServiceError::Unavailable(format!("operation failed: {}", reason)));
                }
                Err(ServiceError::Fatal(reason)) => return Err(ServiceError::Fatal(reason)),
                Err(e) => {
                    consecutive_errors += 1;
                    if consecutive_errors >= self.policy.max_attempts {
                        return Err(e);
                    }
                    warn!("Polling {} failed ({}), will retry", operation, e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Finishes after `polls_until_done` polls.
    struct FakeVeo {
        polls_until_done: u32,
        polls: AtomicU32,
        submit_rate_limits: AtomicU32,
    }

    impl FakeVeo {
        fn new(polls_until_done: u32, submit_rate_limits: u32) -> Self {
            Self {
                polls_until_done,
                polls: AtomicU32::new(0),
                submit_rate_limits: AtomicU32::new(submit_rate_limits),
            }
        }
    }

    #[async_trait]
    impl VideoBackend for FakeVeo {
        async fn submit(&self, api_key: &str, _request: &ClipRequest) -> Result<String, ServiceError> {
            if self.submit_rate_limits.load(Ordering::SeqCst) > 0 {
                self.submit_rate_limits.fetch_sub(1, Ordering::SeqCst);
                return Err(ServiceError::RateLimited("RESOURCE_EXHAUSTED".into()));
            }
            Ok(format!("operations/{}", api_key))
        }

        async fn poll(&self, _api_key: &str, _operation: &str) -> Result<OperationStatus, ServiceError> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= self.polls_until_done {
                Ok(OperationStatus::Done {
                    video_uri: "https://example.com/v.mp4".into(),
                })
            } else {
                Ok(OperationStatus::Pending)
            }
        }

        async fn download(&self, api_key: &str, _uri: &str) -> Result<Vec<u8>, ServiceError> {
            Ok(format!("video-from-{}", api_key).into_bytes())
        }
    }

    fn request() -> ClipRequest {
        ClipRequest {
            prompt: "sunrise".into(),
            duration_secs: 5,
            resolution: "1080x1920".into(),
            format: "mp4".into(),
        }
    }

    fn adapter(backend: Arc<FakeVeo>, policy: RetryPolicy) -> VideoAdapter {
        let rotator = Arc::new(KeyRotator::new(vec!["a".into(), "b".into()]).unwrap());
        VideoAdapter::new(backend, rotator, policy)
    }

    #[test]
    fn test_aspect_ratio() {
        assert_eq!(request().aspect_ratio(), "9:16");
        let landscape = ClipRequest {
            resolution: "1920x1080".into(),
            ..request()
        };
        assert_eq!(landscape.aspect_ratio(), "16:9");
    }

    #[tokio::test]
    async fn test_polls_until_done_and_downloads_with_submitting_key() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("clip_1.mp4");
        let backend = Arc::new(FakeVeo::new(3, 1));

        let outcome = adapter(backend.clone(), RetryPolicy::immediate(5))
            .generate_clip(&request(), &dest)
            .await;

        assert_eq!(outcome, AdapterOutcome::Success(dest.clone()));
        assert_eq!(backend.polls.load(Ordering::SeqCst), 3);
        // First submit was rate limited on key "a", so "b" owns the operation.
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "video-from-b");
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_timeout_degrades_to_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("clip_1.mp4");
        let policy = RetryPolicy {
            poll_interval: Duration::from_secs(10),
            poll_timeout: Some(Duration::from_secs(25)),
            ..RetryPolicy::immediate(5)
        };

        let outcome = adapter(Arc::new(FakeVeo::new(100, 0)), policy)
            .generate_clip(&request(), &dest)
            .await;

        assert!(outcome.is_degraded());
        assert_eq!(std::fs::metadata(&dest).unwrap().len(), 0);
    }
}
