//! Configuration module for Sofy.
//!
//! Handles application settings (TOML), video configurations (YAML) and
//! prompt templates.

mod prompts;
mod settings;
mod video;

pub use prompts::{template_for, MotivationalTemplate, PromptGenerator, PromptTemplate};
pub use settings::{
    DashboardSettings, GeminiSettings, GeneralSettings, PipelineSettings, RetrySettings, Settings,
    TextProvider, TextSettings, VideoPollSettings, YoutubeSettings,
};
pub use video::{
    available_configs, list_available_niches, ClipConfig, MusicConfig, OutputConfig, PromptConfig,
    PromptType, SubtitleConfig, VideoConfig, VoiceoverConfig,
};

#[cfg(test)]
pub(crate) use video::SAMPLE_YAML;
