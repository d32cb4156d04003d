//! Background music adapter.

use super::retry::{call_with_rotation, RetryPolicy};
use super::{placeholder_outcome, write_artifact, AdapterOutcome, ServiceError};
use crate::keys::KeyRotator;
use crate::media::pcm_to_wav;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Parameters for one background track.
#[derive(Debug, Clone, PartialEq)]
pub struct MusicRequest {
    pub prompt: String,
    pub mood: String,
    pub tempo: String,
    pub duration_secs: u32,
}

/// A remote music model returning WAV bytes.
#[async_trait]
pub trait MusicBackend: Send + Sync {
    async fn compose(&self, api_key: &str, request: &MusicRequest) -> Result<Vec<u8>, ServiceError>;
}

/// Renders a silent track of the requested length.
///
/// Used when no music synthesis service is configured, so the editing step
/// always has an audio bed of the right duration.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentMusicBackend;

impl SilentMusicBackend {
    const SAMPLE_RATE: u32 = 8_000;
}

#[async_trait]
impl MusicBackend for SilentMusicBackend {
    async fn compose(&self, _api_key: &str, request: &MusicRequest) -> Result<Vec<u8>, ServiceError> {
        let samples = Self::SAMPLE_RATE as usize * request.duration_secs as usize;
        Ok(pcm_to_wav(&vec![0u8; samples * 2], Self::SAMPLE_RATE, 1, 16))
    }
}

/// Music generation with key rotation and placeholder fallback.
#[derive(Clone)]
pub struct MusicAdapter {
    backend: Arc<dyn MusicBackend>,
    rotator: Arc<KeyRotator>,
    policy: RetryPolicy,
}

impl MusicAdapter {
    pub fn new(backend: Arc<dyn MusicBackend>, rotator: Arc<KeyRotator>, policy: RetryPolicy) -> Self {
        Self {
            backend,
            rotator,
            policy,
        }
    }

    /// Generate a background track into `dest`.
    pub async fn compose(&self, request: &MusicRequest, dest: &Path) -> AdapterOutcome<PathBuf> {
        info!("Generating background music ({}, {} tempo)", request.mood, request.tempo);

        let backend = &self.backend;
        let result = call_with_rotation(&self.rotator, &self.policy, |key| async move {
            backend.compose(&key, request).await
        })
        .await;

        match result {
            Ok(bytes) => match write_artifact(dest, &bytes).await {
                Ok(path) => AdapterOutcome::Success(path),
                Err(e) => AdapterOutcome::Fatal(format!("Failed to write music to {}: {}", dest.display(), e)),
            },
            Err(ServiceError::Fatal(reason)) => AdapterOutcome::Fatal(reason),
            Err(e) => {
                warn!("Music generation failed: {}", e);
                placeholder_outcome(dest, e.to_string()).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(duration_secs: u32) -> MusicRequest {
        MusicRequest {
            prompt: "uplifting".into(),
            mood: "uplifting".into(),
            tempo: "fast".into(),
            duration_secs,
        }
    }

    #[tokio::test]
    async fn test_silent_backend_matches_duration() {
        let bytes = SilentMusicBackend.compose("unused", &request(2)).await.unwrap();
        // 44-byte header + 2s * 8kHz * 2 bytes
        assert_eq!(bytes.len(), 44 + 32_000);
        assert_eq!(&bytes[..4], b"RIFF");
    }

    #[tokio::test]
    async fn test_adapter_writes_track() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("background_music.wav");
        let rotator = Arc::new(KeyRotator::new(vec!["k".into()]).unwrap());
        let adapter = MusicAdapter::new(Arc::new(SilentMusicBackend), rotator, RetryPolicy::immediate(1));

        let outcome = adapter.compose(&request(1), &dest).await;

        assert_eq!(outcome, AdapterOutcome::Success(dest.clone()));
        assert!(std::fs::metadata(&dest).unwrap().len() > 44);
    }
}
