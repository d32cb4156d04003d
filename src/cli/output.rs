//! CLI output formatting utilities.

use crate::monitoring::{Job, JobStatus};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print a one-line job summary.
    pub fn job_line(job: &Job) {
        let status = match job.status {
            JobStatus::Completed => style(job.status.as_str()).green(),
            JobStatus::Failed => style(job.status.as_str()).red(),
            JobStatus::Running => style(job.status.as_str()).yellow(),
            JobStatus::Pending => style(job.status.as_str()).dim(),
        };
        let step = job
            .current_step
            .map(|s| format!(" @ {}", s))
            .unwrap_or_default();

        println!(
            "  {} {} [{}{}] {} / {} ({})",
            style("*").cyan(),
            style(&job.id).bold(),
            status,
            step,
            job.niche,
            job.theme,
            format_duration(job_seconds(job)),
        );
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Seconds a job has been running, or ran in total.
fn job_seconds(job: &Job) -> f64 {
    match job.duration_ms() {
        Some(ms) => ms as f64 / 1000.0,
        None => (chrono::Utc::now() - job.start_time).num_milliseconds() as f64 / 1000.0,
    }
}

/// Format duration in seconds to a human-readable string.
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u32;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}
