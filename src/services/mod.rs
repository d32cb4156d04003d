//! External service adapters.
//!
//! Each adapter wraps one capability of a remote generation API (text, speech,
//! music, video, upload) behind a uniform contract:
//!
//! - quota and rate-limit failures rotate the shared [`KeyRotator`](crate::keys::KeyRotator)
//!   and retry the identical request, bounded by a [`RetryPolicy`];
//! - any other recoverable failure produces a fallback artifact and an
//!   [`AdapterOutcome::Degraded`] result instead of an error;
//! - only failures that leave nothing usable are reported as
//!   [`AdapterOutcome::Fatal`].
//!
//! The raw network calls live behind backend traits so the pipeline can be
//! exercised with in-process fakes.

mod gemini;
mod music;
mod openai;
mod retry;
mod speech;
mod text;
mod upload;
mod video;

pub use gemini::GeminiClient;
pub use music::{MusicAdapter, MusicBackend, MusicRequest, SilentMusicBackend};
pub use openai::OpenAITextBackend;
pub use retry::{call_with_rotation, retry_rate_limited, RetryPolicy};
pub use speech::{resolve_voice, SpeechAdapter, SpeechBackend, SpeechRequest};
pub use text::{TextAdapter, TextBackend};
pub use upload::{UploadAdapter, UploadBackend, UploadMetadata, YoutubeUploader};
pub use video::{ClipRequest, OperationStatus, VideoAdapter, VideoBackend};

use chrono::Utc;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure reported by a backend for a single request.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ServiceError {
    /// The credential in use hit a quota or rate limit.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The service failed in a way a fallback artifact can cover.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The request cannot produce anything usable.
    #[error("{0}")]
    Fatal(String),
}

impl ServiceError {
    /// Classify a failure by HTTP status and message.
    ///
    /// HTTP 429 and messages mentioning a quota or rate limit are treated as
    /// rate limiting; everything else is a transient service failure.
    pub fn classify(status: Option<u16>, message: impl Into<String>) -> Self {
        let message = message.into();
        if status == Some(429) || is_rate_limit_message(&message) {
            ServiceError::RateLimited(message)
        } else {
            ServiceError::Unavailable(message)
        }
    }

    /// Whether this failure should trigger key rotation.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ServiceError::RateLimited(_))
    }
}

/// Check an error message for quota or rate-limit wording.
pub fn is_rate_limit_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("quota")
        || lower.contains("rate limit")
        || lower.contains("rate_limit")
        || lower.contains("resource_exhausted")
        || lower.contains("too many requests")
}

/// Result of an adapter call.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterOutcome<T> {
    /// The external call succeeded.
    Success(T),
    /// The call failed; `value` is a fallback artifact.
    Degraded { value: T, reason: String },
    /// Nothing usable was produced.
    Fatal(String),
}

impl<T> AdapterOutcome<T> {
    /// The produced value, real or fallback.
    pub fn value(self) -> Option<T> {
        match self {
            AdapterOutcome::Success(v) | AdapterOutcome::Degraded { value: v, .. } => Some(v),
            AdapterOutcome::Fatal(_) => None,
        }
    }

    /// Whether a fallback was substituted.
    pub fn is_degraded(&self) -> bool {
        matches!(self, AdapterOutcome::Degraded { .. })
    }

    /// Convert into a `Result`, keeping degraded values as `Ok`.
    pub fn into_result(self) -> std::result::Result<T, String> {
        match self {
            AdapterOutcome::Success(v) | AdapterOutcome::Degraded { value: v, .. } => Ok(v),
            AdapterOutcome::Fatal(reason) => Err(reason),
        }
    }
}

/// Generate a collision-free artifact file name: `<prefix>_<millis>_<suffix>.<ext>`.
pub fn unique_artifact_name(prefix: &str, extension: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{}.{}",
        prefix,
        Utc::now().timestamp_millis(),
        &suffix[..12],
        extension
    )
}

/// Write an artifact, creating parent directories as needed.
pub(crate) async fn write_artifact(path: &Path, bytes: &[u8]) -> std::io::Result<PathBuf> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await?;
    Ok(path.to_path_buf())
}

/// Write an empty placeholder in place of a failed artifact.
///
/// Returns `Degraded` with the placeholder, or `Fatal` if even the placeholder
/// cannot be written.
pub(crate) async fn placeholder_outcome(path: &Path, reason: String) -> AdapterOutcome<PathBuf> {
    match write_artifact(path, &[]).await {
        Ok(p) => {
            tracing::warn!("Created empty placeholder at {} ({})", p.display(), reason);
            AdapterOutcome::Degraded { value: p, reason }
        }
        Err(e) => AdapterOutcome::Fatal(format!(
            "{}; placeholder {} could not be written: {}",
            reason,
            path.display(),
            e
        )),
    }
}
