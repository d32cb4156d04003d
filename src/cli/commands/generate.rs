//! Generate command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::monitoring::MonitoringService;
use crate::orchestrator::Orchestrator;
use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Run the generate command.
pub async fn run_generate(niche: &str, upload: bool, settings: Settings) -> Result<()> {
    let mut config = preflight::load_video_config(niche, &settings)?;
    if upload {
        config.output.upload = true;
    }

    preflight::check(Operation::Generate { upload: config.output.upload }, &settings)?;
    std::fs::create_dir_all(settings.temp_dir())?;

    let monitoring = Arc::new(MonitoringService::from_settings(&settings).await?);
    let orchestrator = Orchestrator::new(&settings, monitoring.clone())?;

    Output::info(&format!(
        "Generating a {}s {} video about \"{}\" ({} clip(s))",
        config.duration,
        config.niche,
        config.theme,
        config.clip_count()
    ));

    let token = CancellationToken::new();
    let ctrl_c = {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("Interrupt received, cancelling job");
                token.cancel();
            }
        })
    };

    let spinner = Output::spinner("Running pipeline...");
    let result = orchestrator.run_with_cancel(&config, token).await;
    spinner.finish_and_clear();
    ctrl_c.abort();
    let report = result?;

    println!();
    Output::kv("Job", &report.job_id);
    Output::kv("Status", report.status.as_str());
    Output::kv("Clips", &report.clips_generated.to_string());
    if let Some(path) = &report.output_path {
        Output::kv("Output", &path.display().to_string());
    }
    if let Some(url) = &report.video_url {
        Output::kv("Video URL", url);
    }
    for note in &report.degraded {
        Output::warning(note);
    }

    println!();
    print!("{}", monitoring.generate_report());

    if !report.succeeded() {
        anyhow::bail!(
            "Job {} failed: {}",
            report.job_id,
            report.error.as_deref().unwrap_or("unknown error")
        );
    }
    Output::success(&format!("Job {} completed", report.job_id));
    Ok(())
}
