//! Pre-flight checks before expensive operations.
//!
//! Validates that credentials and configuration are available before a job
//! is created, so missing keys fail fast instead of midway through a run.

use crate::config::{Settings, TextProvider, VideoConfig};
use crate::error::{Result, SofyError};
use crate::keys::KeyRotator;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Generation needs Gemini keys, text provider keys and, when uploading, a token.
    Generate { upload: bool },
}

/// Run pre-flight checks for the given operation against the process environment.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    check_with(operation, settings, |name| std::env::var(name).ok())
}

/// Run pre-flight checks using an arbitrary variable lookup.
pub fn check_with<F>(operation: Operation, settings: &Settings, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    match operation {
        Operation::Generate { upload } => {
            KeyRotator::discover(TextProvider::Gemini.key_prefix(), &lookup)?;
            if settings.text.provider != TextProvider::Gemini {
                KeyRotator::discover(settings.text.provider.key_prefix(), &lookup)?;
            }
            if upload {
                check_upload_token(settings, &lookup)?;
            }
        }
    }
    Ok(())
}

fn check_upload_token<F>(settings: &Settings, lookup: &F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let name = settings.youtube.access_token_env.as_str();
    match lookup(name) {
        Some(token) if !token.trim().is_empty() => Ok(()),
        _ => Err(SofyError::Config(format!(
            "Upload requested but {} is not set. Export an OAuth access token with the youtube.upload scope.",
            name
        ))),
    }
}

/// Load a video configuration, naming the available ones when it is missing.
pub fn load_video_config(name: &str, settings: &Settings) -> Result<VideoConfig> {
    let config_dir = settings.config_dir();
    VideoConfig::load(name, &config_dir).map_err(|e| {
        let niches = crate::config::list_available_niches(&config_dir);
        if niches.is_empty() {
            e
        } else {
            SofyError::Config(format!("{}. Available niches: {}", e, niches.join(", ")))
        }
    })
}
