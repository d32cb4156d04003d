//! Job history commands.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::SofyError;
use crate::monitoring::{Job, MonitoringService};
use anyhow::Result;

/// List recorded jobs, newest first.
pub async fn run_jobs(active: bool, json: bool, settings: Settings) -> Result<()> {
    let monitoring = MonitoringService::from_settings(&settings).await?;

    let mut jobs: Vec<Job> = if active {
        monitoring.active_jobs().await
    } else {
        monitoring.list_jobs().await
    };
    jobs.reverse();

    if json {
        println!("{}", serde_json::to_string_pretty(&jobs)?);
        return Ok(());
    }

    if jobs.is_empty() {
        Output::info(if active {
            "No active jobs."
        } else {
            "No jobs recorded yet. Use 'sofy generate <niche>' to run one."
        });
        return Ok(());
    }

    Output::header(&format!("Jobs ({})", jobs.len()));
    println!();
    for job in &jobs {
        Output::job_line(job);
    }
    Ok(())
}

/// Show every field of one job.
pub async fn run_job(id: &str, settings: Settings) -> Result<()> {
    let monitoring = MonitoringService::from_settings(&settings).await?;
    let job = monitoring
        .get_job(id)
        .await
        .ok_or_else(|| SofyError::UnknownJob(id.to_string()))?;

    Output::header(&format!("Job {}", job.id));
    Output::kv("Status", job.status.as_str());
    Output::kv("Niche", &job.niche);
    Output::kv("Theme", &job.theme);
    Output::kv("Started", &job.start_time.to_rfc3339());
    if let Some(end) = job.end_time {
        Output::kv("Finished", &end.to_rfc3339());
    }
    if let Some(ms) = job.duration_ms() {
        Output::kv("Duration", &format!("{:.2}s", ms as f64 / 1000.0));
    }
    if let Some(step) = job.current_step {
        Output::kv("Step", step.as_str());
    }
    if let Some(path) = &job.output_path {
        Output::kv("Output", path);
    }
    if let Some(error) = &job.error {
        Output::kv("Error", error);
    }
    Ok(())
}
