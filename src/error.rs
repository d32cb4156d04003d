//! Error types for Sofy.

use crate::monitoring::JobStep;
use thiserror::Error;

/// Library-level error type for Sofy operations.
#[derive(Error, Debug)]
pub enum SofyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Service error: {0}")]
    Service(String),

    #[error("Step {step} failed: {reason}")]
    Step { step: JobStep, reason: String },

    #[error("Job not found: {0}")]
    UnknownJob(String),

    #[error("Job cancelled: {0}")]
    Cancelled(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SofyError {
    /// Build a step failure for the given pipeline step.
    pub fn step(step: JobStep, reason: impl Into<String>) -> Self {
        SofyError::Step {
            step,
            reason: reason.into(),
        }
    }
}

/// Result type alias for Sofy operations.
pub type Result<T> = std::result::Result<T, SofyError>;
