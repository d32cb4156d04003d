//! Sofy CLI entry point.

use anyhow::Result;
use clap::Parser;
use sofy::cli::{commands, Cli, Commands};
use sofy::config::Settings;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("sofy={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let config_path = cli
        .config
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(Settings::default_config_path);
    let settings = Settings::load_from(Some(&config_path))?;

    // Ensure data directories exist
    std::fs::create_dir_all(settings.data_dir())?;
    std::fs::create_dir_all(settings.temp_dir())?;

    // Execute command
    match &cli.command {
        Commands::Generate { niche, upload } => {
            commands::run_generate(niche, *upload, settings).await?;
        }

        Commands::List => {
            commands::run_list(&settings)?;
        }

        Commands::Jobs { active, json } => {
            commands::run_jobs(*active, *json, settings).await?;
        }

        Commands::Job { id } => {
            commands::run_job(id, settings).await?;
        }

        Commands::Report => {
            commands::run_report(&settings)?;
        }

        Commands::Monitor { interval } => {
            commands::run_monitor(*interval, settings).await?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings, &config_path)?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings, &config_path)?;
        }
    }

    Ok(())
}
