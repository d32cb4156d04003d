//! YAML video configurations.
//!
//! Each file in the configuration directory describes one kind of video: its
//! niche, prompt style, clip layout, voice, music, subtitles and output.

use crate::error::{Result, SofyError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::warn;

/// How clip prompts are produced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum PromptType {
    /// Fixed niche templates.
    Static,
    /// Variations generated by the text model, falling back to templates.
    Dynamic,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptConfig {
    #[serde(rename = "type")]
    pub prompt_type: PromptType,
    pub topic: String,
    pub tone: String,
    pub emotion: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClipConfig {
    pub resolution: String,
    pub format: String,
    /// Length of each generated sub-clip, in seconds.
    pub stitch_length: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoiceoverConfig {
    pub model: String,
    pub voice: String,
    /// Speaker label to voice, for dialogue scripts.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub speakers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MusicConfig {
    pub model: String,
    pub mood: String,
    pub tempo: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubtitleConfig {
    pub enable: bool,
    pub style: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    pub path: String,
    pub upload: bool,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub category_id: Option<u32>,
    #[serde(default)]
    pub privacy_status: Option<String>,
}

/// One video configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoConfig {
    pub niche: String,
    pub theme: String,
    pub language: String,
    /// Target length of the final video, in seconds.
    pub duration: u32,
    pub style: String,
    pub prompt: PromptConfig,
    pub video: ClipConfig,
    pub voiceover: VoiceoverConfig,
    pub music: MusicConfig,
    pub subtitles: SubtitleConfig,
    pub output: OutputConfig,
}

impl VideoConfig {
    /// Parse and validate YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: VideoConfig = serde_yaml::from_str(content)
            .map_err(|e| SofyError::Config(format!("Invalid video configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration by niche name or path.
    ///
    /// `name` is tried as given, then as `<config_dir>/<name>`, then with
    /// `.yaml` and `.yml` extensions.
    pub fn load(name: &str, config_dir: &Path) -> Result<Self> {
        let path = Self::resolve(name, config_dir)?;
        let content = std::fs::read_to_string(&path)?;
        Self::from_yaml(&content)
            .map_err(|e| SofyError::Config(format!("{} ({})", e, path.display())))
    }

    fn resolve(name: &str, config_dir: &Path) -> Result<PathBuf> {
        let candidates = [
            PathBuf::from(name),
            config_dir.join(name),
            config_dir.join(format!("{}.yaml", name)),
            config_dir.join(format!("{}.yml", name)),
        ];

        candidates
            .iter()
            .find(|p| p.is_file())
            .cloned()
            .ok_or_else(|| {
                SofyError::Config(format!(
                    "Configuration file not found: {} (looked in {})",
                    name,
                    config_dir.display()
                ))
            })
    }

    /// Check values that deserialization alone does not enforce.
    pub fn validate(&self) -> Result<()> {
        let missing = |what: &str| Err(SofyError::Config(format!("Missing {}", what)));

        if self.niche.trim().is_empty() {
            return missing("niche");
        }
        if self.prompt.topic.trim().is_empty() {
            return missing("prompt topic");
        }
        if self.video.resolution.trim().is_empty() {
            return missing("video resolution");
        }
        if self.video.format.trim().is_empty() {
            return missing("video format");
        }
        if self.video.stitch_length == 0 {
            return Err(SofyError::Config(
                "Invalid stitch length: must be a positive number".to_string(),
            ));
        }
        if self.duration == 0 {
            return Err(SofyError::Config("Invalid duration: must be a positive number".to_string()));
        }
        if self.output.path.trim().is_empty() {
            return missing("output path");
        }
        Ok(())
    }

    /// Number of sub-clips: ceil(duration / stitch_length).
    pub fn clip_count(&self) -> usize {
        self.duration.div_ceil(self.video.stitch_length) as usize
    }

    /// Output directory with `~` expanded.
    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.output.path).to_string())
    }

    /// Sample configuration used across tests.
    #[cfg(test)]
    pub(crate) fn sample() -> Self {
        Self::from_yaml(SAMPLE_YAML).expect("sample config is valid")
    }
}

/// YAML files in `config_dir`, sorted by name.
pub fn available_configs(config_dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(config_dir) else {
        return Vec::new();
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == "yaml" || e == "yml")
        })
        .collect();
    files.sort();
    files
}

/// Distinct niches across the parseable configurations in `config_dir`.
pub fn list_available_niches(config_dir: &Path) -> Vec<String> {
    let mut niches = BTreeSet::new();
    for path in available_configs(config_dir) {
        match std::fs::read_to_string(&path)
            .map_err(SofyError::from)
            .and_then(|content| VideoConfig::from_yaml(&content))
        {
            Ok(config) => {
                niches.insert(config.niche);
            }
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }
    niches.into_iter().collect()
}

#[cfg(test)]
pub(crate) const SAMPLE_YAML: &str = r#"
niche: motivational
theme: overcoming obstacles
language: en
duration: 15
style: cinematic
prompt:
  type: static
  topic: perseverance
  tone: uplifting
  emotion: determined
video:
  resolution: 1080x1920
  format: mp4
  stitch_length: 5
voiceover:
  model: gemini-tts
  voice: deep_male
music:
  model: lyria
  mood: uplifting
  tempo: medium
subtitles:
  enable: true
  style: bold
output:
  path: ./output
  upload: false
"#;
