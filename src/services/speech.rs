//! Speech synthesis adapter (single and multi-speaker).

use super::retry::{call_with_rotation, RetryPolicy};
use super::{placeholder_outcome, write_artifact, AdapterOutcome, ServiceError};
use crate::keys::KeyRotator;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// What to say and with which voice(s).
#[derive(Debug, Clone, PartialEq)]
pub enum SpeechRequest {
    /// One narrator.
    Single { text: String, voice: String },
    /// Labelled dialogue; maps speaker label to voice name.
    MultiSpeaker {
        text: String,
        speakers: BTreeMap<String, String>,
    },
}

impl SpeechRequest {
    pub fn text(&self) -> &str {
        match self {
            SpeechRequest::Single { text, .. } | SpeechRequest::MultiSpeaker { text, .. } => text,
        }
    }
}

/// A remote text-to-speech model returning WAV bytes.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    async fn synthesize(&self, api_key: &str, request: &SpeechRequest) -> Result<Vec<u8>, ServiceError>;
}

/// Map a configured voice alias to a prebuilt voice name.
pub fn resolve_voice(voice: &str) -> String {
    match voice.trim() {
        "deep_male" => "Kore".to_string(),
        "" => "Puck".to_string(),
        other => other.to_string(),
    }
}

/// Speech synthesis with key rotation and silent-file fallback.
#[derive(Clone)]
pub struct SpeechAdapter {
    backend: Arc<dyn SpeechBackend>,
    rotator: Arc<KeyRotator>,
    policy: RetryPolicy,
}

impl SpeechAdapter {
    pub fn new(backend: Arc<dyn SpeechBackend>, rotator: Arc<KeyRotator>, policy: RetryPolicy) -> Self {
        Self {
            backend,
            rotator,
            policy,
        }
    }

    /// Synthesize `text` with a single voice into `dest`.
    pub async fn narrate(&self, text: &str, voice: &str, dest: &Path) -> AdapterOutcome<PathBuf> {
        let request = SpeechRequest::Single {
            text: text.to_string(),
            voice: resolve_voice(voice),
        };
        self.synthesize_to(&request, dest).await
    }

    /// Synthesize a labelled dialogue with one voice per speaker into `dest`.
    pub async fn narrate_dialogue(
        &self,
        text: &str,
        speakers: &BTreeMap<String, String>,
        dest: &Path,
    ) -> AdapterOutcome<PathBuf> {
        let request = SpeechRequest::MultiSpeaker {
            text: text.to_string(),
            speakers: speakers
                .iter()
                .map(|(speaker, voice)| (speaker.clone(), resolve_voice(voice)))
                .collect(),
        };
        self.synthesize_to(&request, dest).await
    }

    #[instrument(skip(self, request), fields(dest = %dest.display()))]
    async fn synthesize_to(&self, request: &SpeechRequest, dest: &Path) -> AdapterOutcome<PathBuf> {
        let preview: String = request.text().chars().take(50).collect();
        info!("Synthesizing speech: \"{}...\"", preview);

        let backend = &self.backend;
        let result = call_with_rotation(&self.rotator, &self.policy, |key| async move {
            backend.synthesize(&key, request).await
        })
        .await;

        match result {
            Ok(bytes) if !bytes.is_empty() => match write_artifact(dest, &bytes).await {
                Ok(path) => {
                    info!("Audio saved to {}", path.display());
                    AdapterOutcome::Success(path)
                }
                Err(e) => AdapterOutcome::Fatal(format!("Failed to write audio to {}: {}", dest.display(), e)),
            },
            Ok(_) => placeholder_outcome(dest, "speech service returned no audio".to_string()).await,
            Err(ServiceError::Fatal(reason)) => AdapterOutcome::Fatal(reason),
            Err(e) => {
                warn!("Speech synthesis failed: {}", e);
                placeholder_outcome(dest, e.to_string()).await
            }
        }
    }
}
