//! Sofy - short-form video generation
//!
//! A CLI tool that assembles short videos from generative AI services and
//! keeps a record of every job it runs.
//!
//! # Overview
//!
//! Sofy allows you to:
//! - Describe a video once as a YAML configuration (niche, style, voice, music)
//! - Generate clips, a voiceover script, narration and background music
//! - Stitch the result into a final video and optionally upload it
//! - Follow jobs, logs and analytics from a terminal dashboard
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Application settings, video configurations and prompt templates
//! - `keys` - API key rotation across rate-limited credentials
//! - `services` - Adapters for the text, speech, music, video and upload APIs
//! - `media` - Editing seam between generated artifacts and the final video
//! - `monitoring` - Job records, event log, metrics and dashboard
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use sofy::config::{Settings, VideoConfig};
//! use sofy::monitoring::MonitoringService;
//! use sofy::orchestrator::Orchestrator;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let monitoring = Arc::new(MonitoringService::from_settings(&settings).await?);
//!     let orchestrator = Orchestrator::new(&settings, monitoring)?;
//!
//!     let config = VideoConfig::load("motivational", &settings.config_dir())?;
//!     let report = orchestrator.run(&config).await?;
//!     println!("Job {} finished as {}", report.job_id, report.status);
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod keys;
pub mod media;
pub mod monitoring;
pub mod orchestrator;
pub mod services;

pub use error::{Result, SofyError};
