//! Text generation adapter.

use super::retry::{call_with_rotation, RetryPolicy};
use super::{AdapterOutcome, ServiceError};
use crate::keys::KeyRotator;
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::{debug, instrument, warn};

/// A remote text-generation model.
#[async_trait]
pub trait TextBackend: Send + Sync {
    /// Generate a completion for `prompt` using `api_key`.
    async fn generate(&self, api_key: &str, prompt: &str) -> Result<String, ServiceError>;
}

/// Text generation with key rotation and fallback text.
#[derive(Clone)]
pub struct TextAdapter {
    backend: Arc<dyn TextBackend>,
    rotator: Arc<KeyRotator>,
    policy: RetryPolicy,
}

impl TextAdapter {
    pub fn new(backend: Arc<dyn TextBackend>, rotator: Arc<KeyRotator>, policy: RetryPolicy) -> Self {
        Self {
            backend,
            rotator,
            policy,
        }
    }

    /// Generate text, rotating keys on rate limits. Errors are returned as-is.
    #[instrument(skip_all, fields(prompt_len = prompt.len()))]
    pub async fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        let backend = &self.backend;
        let text = call_with_rotation(&self.rotator, &self.policy, |key| async move {
            backend.generate(&key, prompt).await
        })
        .await?;

        if text.trim().is_empty() {
            return Err(ServiceError::Unavailable("empty response from text model".to_string()));
        }

        debug!("Generated {} characters", text.len());
        Ok(text)
    }

    /// Generate text, substituting `fallback` when the service fails.
    pub async fn generate_or(&self, prompt: &str, fallback: impl Into<String>) -> AdapterOutcome<String> {
        match self.generate(prompt).await {
            Ok(text) => AdapterOutcome::Success(text),
            Err(ServiceError::Fatal(reason)) => AdapterOutcome::Fatal(reason),
            Err(e) => {
                let reason = e.to_string();
                warn!("Text generation failed, using fallback: {}", reason);
                AdapterOutcome::Degraded {
                    value: fallback.into(),
                    reason,
                }
            }
        }
    }

    /// Generate a voiceover script and save a copy next to the other artifacts.
    pub async fn write_script(
        &self,
        prompt: &str,
        fallback: impl Into<String>,
        dest: &Path,
    ) -> AdapterOutcome<String> {
        let outcome = self.generate_or(prompt, fallback).await;
        if let AdapterOutcome::Success(script) | AdapterOutcome::Degraded { value: script, .. } = &outcome {
            if let Err(e) = super::write_artifact(dest, script.as_bytes()).await {
                warn!("Failed to save script to {}: {}", dest.display(), e);
            }
        }
        outcome
    }

    /// Ask the model for `count` numbered variations and parse them.
    ///
    /// Returns whatever list items the response contains, which may be fewer
    /// than requested.
    pub async fn generate_list(&self, prompt: &str, count: usize) -> Result<Vec<String>, ServiceError> {
        let response = self.generate(prompt).await?;
        Ok(parse_list_items(&response, count))
    }
}

/// Extract numbered (`1.`) or bulleted (`-`) lines from a model response.
pub(crate) fn parse_list_items(response: &str, limit: usize) -> Vec<String> {
    static ITEM: OnceLock<Regex> = OnceLock::new();
    let item = ITEM.get_or_init(|| Regex::new(r"^\s*(?:\d+[.)]|[-*])\s*(.+)$").expect("valid list regex"));
    response
        .lines()
        .filter_map(|line| item.captures(line))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Replays a fixed sequence of responses and records the keys used.
    struct ScriptedBackend {
        responses: Mutex<Vec<Result<String, ServiceError>>>,
        keys_seen: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn new(mut responses: Vec<Result<String, ServiceError>>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                keys_seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextBackend for ScriptedBackend {
        async fn generate(&self, api_key: &str, _prompt: &str) -> Result<String, ServiceError> {
            self.keys_seen.lock().unwrap().push(api_key.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(ServiceError::Unavailable("exhausted".into())))
        }
    }

    fn adapter(backend: Arc<ScriptedBackend>, keys: usize) -> (TextAdapter, Arc<KeyRotator>) {
        let rotator = Arc::new(KeyRotator::new((0..keys).map(|i| format!("key{}", i)).collect()).unwrap());
        (
            TextAdapter::new(backend, rotator.clone(), RetryPolicy::immediate(10)),
            rotator,
        )
    }

    #[tokio::test]
    async fn test_rate_limits_rotate_then_succeed() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Err(ServiceError::RateLimited("Quota exceeded".into())),
            Err(ServiceError::RateLimited("rate limit".into())),
            Ok("A script".into()),
        ]));
        let (adapter, rotator) = adapter(backend.clone(), 3);

        let outcome = adapter.generate_or("prompt", "fallback").await;

        assert_eq!(outcome, AdapterOutcome::Success("A script".to_string()));
        assert_eq!(rotator.current_index(), 2);
        assert_eq!(*backend.keys_seen.lock().unwrap(), vec!["key0", "key1", "key2"]);
    }

    #[tokio::test]
    async fn test_transient_failure_degrades_to_fallback() {
        let backend = Arc::new(ScriptedBackend::new(vec![Err(ServiceError::Unavailable("503".into()))]));
        let (adapter, rotator) = adapter(backend, 2);

        let outcome = adapter.generate_or("prompt", "fallback").await;

        assert!(outcome.is_degraded());
        assert_eq!(outcome.value().as_deref(), Some("fallback"));
        assert_eq!(rotator.current_index(), 0);
    }

    #[tokio::test]
    async fn test_empty_response_is_degraded() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok("   ".into())]));
        let (adapter, _) = adapter(backend, 1);
        assert!(adapter.generate_or("prompt", "fallback").await.is_degraded());
    }

    #[tokio::test]
    async fn test_write_script_saves_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("script.txt");
        let backend = Arc::new(ScriptedBackend::new(vec![Ok("Keep going.".into())]));
        let (adapter, _) = adapter(backend, 1);

        let outcome = adapter.write_script("prompt", "fallback", &dest).await;

        assert_eq!(outcome.value().as_deref(), Some("Keep going."));
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "Keep going.");
    }

    #[test]
    fn test_parse_list_items() {
        let response = "Here are some ideas:\n1. Sunrise run\n2) Late night study\n- Climbing\nnot an item\n3. Extra";
        assert_eq!(
            parse_list_items(response, 3),
            vec!["Sunrise run", "Late night study", "Climbing"]
        );
    }

    #[test]
    fn test_parse_list_items_is_repeatable() {
        for _ in 0..3 {
            assert_eq!(parse_list_items("* One\n10. Two", 5), vec!["One", "Two"]);
        }
        assert!(parse_list_items("no list here", 5).is_empty());
    }
}
