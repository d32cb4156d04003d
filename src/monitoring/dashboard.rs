//! Periodic terminal snapshot of jobs, analytics and recent log lines.

use super::job::{Job, JobStatus};
use super::MonitoringService;
use crate::config::DashboardSettings;
use chrono::{SecondsFormat, Utc};
use console::{style, Term};
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

const RECENT_JOBS: usize = 5;
const TOP_NICHES: usize = 3;

/// Read-only view over a [`MonitoringService`].
pub struct Dashboard {
    monitoring: Arc<MonitoringService>,
    settings: DashboardSettings,
}

impl Dashboard {
    pub fn new(monitoring: Arc<MonitoringService>, settings: DashboardSettings) -> Self {
        Self { monitoring, settings }
    }

    /// Build the current snapshot.
    pub async fn render(&self) -> String {
        if let Err(e) = self.monitoring.refresh().await {
            warn!("Failed to refresh job records: {}", e);
        }
        let jobs = self.monitoring.list_jobs().await;
        let metrics = self.monitoring.metrics();
        let logs = self
            .monitoring
            .logger()
            .recent_entries(self.settings.max_log_entries);

        let mut out = String::new();
        let _ = writeln!(out, "{}", style("=== SOFY MONITORING DASHBOARD ===").bold());
        let _ = writeln!(
            out,
            "Last updated: {}\n",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
        );

        let _ = writeln!(out, "=== ACTIVE JOBS ===");
        let active: Vec<&Job> = jobs.iter().filter(|job| job.is_active()).collect();
        if active.is_empty() {
            let _ = writeln!(out, "No active jobs");
        }
        for job in active {
            render_job(&mut out, job);
        }
        out.push('\n');

        if !self.settings.show_active_only {
            let _ = writeln!(out, "=== RECENT JOBS ===");
            let mut finished: Vec<&Job> = jobs.iter().filter(|job| job.status.is_terminal()).collect();
            finished.sort_by(|a, b| b.end_time.cmp(&a.end_time));
            if finished.is_empty() {
                let _ = writeln!(out, "No recent jobs");
            }
            for job in finished.into_iter().take(RECENT_JOBS) {
                render_job(&mut out, job);
            }
            out.push('\n');
        }

        let _ = writeln!(out, "=== ANALYTICS ===");
        let _ = writeln!(out, "Total Jobs: {}", metrics.total_jobs);
        let _ = writeln!(out, "Success Rate: {:.2}%", metrics.success_rate);
        let _ = writeln!(
            out,
            "Average Processing Time: {:.2} seconds",
            metrics.average_processing_time / 1000.0
        );
        let top = metrics.top_niches(TOP_NICHES);
        if !top.is_empty() {
            let _ = writeln!(out, "Top Niches:");
            for (niche, count) in top {
                let _ = writeln!(out, "  - {}: {} jobs", niche, count);
            }
        }
        out.push('\n');

        let _ = writeln!(out, "=== RECENT LOGS ===");
        if logs.is_empty() {
            let _ = writeln!(out, "No recent logs");
        }
        for entry in logs {
            let _ = writeln!(out, "{}", entry.format());
        }

        let _ = writeln!(out, "\nPress Ctrl+C to exit");
        out
    }

    /// Redraw every refresh interval until `token` is cancelled.
    pub async fn run(&self, token: CancellationToken) {
        let term = Term::stdout();
        let mut ticker = tokio::time::interval(Duration::from_secs(self.settings.refresh_interval_secs.max(1)));

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    let frame = self.render().await;
                    if let Err(e) = term.clear_screen().and_then(|_| term.write_str(&frame)) {
                        warn!("Failed to draw dashboard: {}", e);
                    }
                }
            }
        }
    }
}

fn render_job(out: &mut String, job: &Job) {
    let end = job.end_time.unwrap_or_else(Utc::now);
    let seconds = (end - job.start_time).num_milliseconds() as f64 / 1000.0;

    let status = match job.status {
        JobStatus::Running => style(job.status.as_str()).yellow(),
        JobStatus::Completed => style(job.status.as_str()).green(),
        JobStatus::Failed => style(job.status.as_str()).red(),
        JobStatus::Pending => style(job.status.as_str()),
    };

    let _ = write!(
        out,
        "{} | {} | {} | {} | {:.2}s",
        job.id, status, job.niche, job.theme, seconds
    );
    if let Some(step) = job.current_step {
        let _ = write!(out, " | Step: {}", step);
    }
    out.push('\n');
    if let Some(error) = &job.error {
        let _ = writeln!(out, "  Error: {}", error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::JobStep;

    async fn dashboard(dir: &std::path::Path, show_active_only: bool) -> (Dashboard, Arc<MonitoringService>) {
        let monitoring = Arc::new(MonitoringService::in_memory(&dir.join("logs")).await.unwrap());
        let settings = DashboardSettings {
            show_active_only,
            ..DashboardSettings::default()
        };
        (Dashboard::new(monitoring.clone(), settings), monitoring)
    }

    #[tokio::test]
    async fn test_empty_dashboard() {
        let dir = tempfile::tempdir().unwrap();
        let (dashboard, _) = dashboard(dir.path(), false).await;

        let frame = dashboard.render().await;

        assert!(frame.contains("No active jobs"));
        assert!(frame.contains("No recent jobs"));
        assert!(frame.contains("Total Jobs: 0"));
        assert!(frame.contains("No recent logs"));
    }

    #[tokio::test]
    async fn test_sections_list_jobs_and_logs() {
        let dir = tempfile::tempdir().unwrap();
        let (dashboard, monitoring) = dashboard(dir.path(), false).await;

        let running = monitoring.start_job("motivational", "grit").await.unwrap();
        monitoring
            .update_status(&running, JobStatus::Running, Some(JobStep::MusicGeneration), None)
            .await
            .unwrap();
        let failed = monitoring.start_job("fitness", "strength").await.unwrap();
        monitoring
            .update_status(&failed, JobStatus::Failed, Some(JobStep::FinalRender), Some("too large"))
            .await
            .unwrap();

        let frame = dashboard.render().await;

        let active = frame.find("=== ACTIVE JOBS ===").unwrap();
        let recent = frame.find("=== RECENT JOBS ===").unwrap();
        let running_pos = frame.find(&running).unwrap();
        assert!(active < running_pos && running_pos < recent);
        assert!(frame.contains("Step: music_generation"));
        assert!(frame.contains("  Error: too large"));
        assert!(frame.contains("  - fitness: 1 jobs"));
        assert!(frame.contains(&format!("[Job: {}] Job {} failed", failed, failed)));
    }

    #[tokio::test]
    async fn test_active_only_hides_recent_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let (dashboard, _) = dashboard(dir.path(), true).await;
        assert!(!dashboard.render().await.contains("=== RECENT JOBS ==="));
    }

    #[tokio::test]
    async fn test_run_stops_when_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let (dashboard, _) = dashboard(dir.path(), false).await;
        let token = CancellationToken::new();
        token.cancel();
        dashboard.run(token).await;
    }
}
