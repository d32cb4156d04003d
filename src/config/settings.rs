//! Configuration settings for Sofy.

use crate::error::{Result, SofyError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub text: TextSettings,
    pub gemini: GeminiSettings,
    pub retry: RetrySettings,
    pub video: VideoPollSettings,
    pub pipeline: PipelineSettings,
    pub dashboard: DashboardSettings,
    pub youtube: YoutubeSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for job records, metrics and logs.
    pub data_dir: String,
    /// Working directory for generated artifacts.
    pub temp_dir: String,
    /// Directory containing the YAML video configurations.
    pub config_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.sofy".to_string(),
            temp_dir: "/tmp/sofy".to_string(),
            config_dir: "./config".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Text generation provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum TextProvider {
    #[default]
    Gemini,
    OpenAI,
}

impl TextProvider {
    /// Prefix of the environment variables holding this provider's keys.
    pub fn key_prefix(&self) -> &'static str {
        match self {
            TextProvider::Gemini => "GEMINI_API_KEY",
            TextProvider::OpenAI => "OPENAI_API_KEY",
        }
    }
}

impl std::str::FromStr for TextProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" | "google" => Ok(TextProvider::Gemini),
            "openai" => Ok(TextProvider::OpenAI),
            _ => Err(format!("Unknown text provider: {}", s)),
        }
    }
}

impl std::fmt::Display for TextProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextProvider::Gemini => write!(f, "gemini"),
            TextProvider::OpenAI => write!(f, "openai"),
        }
    }
}

/// Script and prompt generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextSettings {
    /// Text provider (gemini, openai).
    pub provider: TextProvider,
    /// Model used for scripts and prompt variations.
    pub model: String,
}

impl Default for TextSettings {
    fn default() -> Self {
        Self {
            provider: TextProvider::Gemini,
            model: "gemini-2.0-flash".to_string(),
        }
    }
}

/// Gemini API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    pub base_url: String,
    /// Model for speech synthesis.
    pub tts_model: String,
    /// Model for video clip generation.
    pub video_model: String,
    /// Timeout for a single HTTP request.
    pub request_timeout_secs: u64,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            tts_model: "gemini-2.5-flash-preview-tts".to_string(),
            video_model: "veo-2.0-generate-001".to_string(),
            request_timeout_secs: 300,
        }
    }
}

/// Rate-limit retry settings shared by all adapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Attempts per call, including the first.
    pub max_attempts: u32,
    /// Backoff base once every key has been tried.
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 11,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            jitter: true,
        }
    }
}

/// Polling of long-running video operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoPollSettings {
    pub poll_interval_secs: u64,
    /// 0 disables the timeout.
    pub poll_timeout_secs: u64,
}

impl Default for VideoPollSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            poll_timeout_secs: 600,
        }
    }
}

impl VideoPollSettings {
    pub fn poll_timeout(&self) -> Option<u64> {
        (self.poll_timeout_secs > 0).then_some(self.poll_timeout_secs)
    }
}

/// Pipeline execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Sub-clips generated concurrently (1 = strictly sequential).
    pub max_concurrent_clips: usize,
    /// Fail a job that runs longer than this. 0 disables the timeout.
    pub job_timeout_secs: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_concurrent_clips: 1,
            job_timeout_secs: 0,
        }
    }
}

/// Dashboard settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardSettings {
    pub refresh_interval_secs: u64,
    pub max_log_entries: usize,
    pub show_active_only: bool,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 5,
            max_log_entries: 10,
            show_active_only: false,
        }
    }
}

/// YouTube upload settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeSettings {
    /// Environment variable holding an OAuth access token.
    pub access_token_env: String,
    pub upload_url: String,
    /// Size limit checked before upload.
    pub max_upload_mb: u64,
    pub request_timeout_secs: u64,
}

impl Default for YoutubeSettings {
    fn default() -> Self {
        Self {
            access_token_env: "YOUTUBE_ACCESS_TOKEN".to_string(),
            upload_url: "https://www.googleapis.com/upload/youtube/v3/videos".to_string(),
            max_upload_mb: 256,
            request_timeout_secs: 600,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| SofyError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Set a `section.key` value, keeping the existing value's type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let (section, field) = key
            .split_once('.')
            .ok_or_else(|| SofyError::Config(format!("Expected <section>.<key>, got \"{}\"", key)))?;

        let mut root = toml::Value::try_from(&*self).map_err(|e| SofyError::Config(e.to_string()))?;
        let slot = root
            .get_mut(section)
            .and_then(|s| s.get_mut(field))
            .ok_or_else(|| SofyError::Config(format!("Unknown configuration key: {}", key)))?;

        *slot = match slot {
            toml::Value::Boolean(_) => toml::Value::Boolean(
                value
                    .parse()
                    .map_err(|_| SofyError::Config(format!("{} expects true or false", key)))?,
            ),
            toml::Value::Integer(_) => toml::Value::Integer(
                value
                    .parse()
                    .map_err(|_| SofyError::Config(format!("{} expects an integer", key)))?,
            ),
            _ => toml::Value::String(value.to_string()),
        };

        *self = root.try_into().map_err(|e: toml::de::Error| SofyError::Config(e.to_string()))?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sofy")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Get the expanded video configuration directory.
    pub fn config_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.config_dir)
    }

    pub fn jobs_db_path(&self) -> PathBuf {
        self.data_dir().join("jobs.db")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir().join("logs")
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.data_dir().join("analytics").join("metrics.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let settings: Settings = toml::from_str("[retry]\nmax_attempts = 3\n").unwrap();
        assert_eq!(settings.retry.max_attempts, 3);
        assert_eq!(settings.retry.base_delay_ms, 500);
        assert_eq!(settings.video.poll_interval_secs, 10);
        assert_eq!(settings.text.provider, TextProvider::Gemini);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut settings = Settings::default();
        settings.text.provider = TextProvider::OpenAI;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.text.provider, TextProvider::OpenAI);
    }

    #[test]
    fn test_set_keeps_types() {
        let mut settings = Settings::default();
        settings.set("pipeline.max_concurrent_clips", "3").unwrap();
        settings.set("retry.jitter", "false").unwrap();
        settings.set("text.provider", "openai").unwrap();

        assert_eq!(settings.pipeline.max_concurrent_clips, 3);
        assert!(!settings.retry.jitter);
        assert_eq!(settings.text.provider, TextProvider::OpenAI);

        assert!(settings.set("retry.max_attempts", "many").is_err());
        assert!(settings.set("nope.key", "1").is_err());
        assert!(settings.set("noseparator", "1").is_err());
    }

    #[test]
    fn test_poll_timeout_zero_disables() {
        let mut poll = VideoPollSettings::default();
        assert_eq!(poll.poll_timeout(), Some(600));
        poll.poll_timeout_secs = 0;
        assert_eq!(poll.poll_timeout(), None);
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!("OpenAI".parse::<TextProvider>().unwrap(), TextProvider::OpenAI);
        assert_eq!(TextProvider::Gemini.to_string(), "gemini");
        assert!("claude".parse::<TextProvider>().is_err());
    }
}
