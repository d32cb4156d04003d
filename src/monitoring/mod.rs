//! Job monitoring: records, event log and analytics behind one service.

mod analytics;
mod dashboard;
mod job;
mod logger;
mod store;
mod tracker;

pub use analytics::{MetricsAggregator, MetricsSnapshot};
pub use dashboard::Dashboard;
pub use job::{new_job_id, Job, JobStatus, JobStep};
pub use logger::{EventLogger, LogEntry, LogLevel};
pub use store::{JobStore, MemoryJobStore, SqliteJobStore};
pub use tracker::JobTracker;

use crate::config::Settings;
use crate::error::Result;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

/// The single entry point the pipeline reports to.
pub struct MonitoringService {
    tracker: JobTracker,
    logger: Arc<EventLogger>,
    metrics: MetricsAggregator,
}

impl MonitoringService {
    /// Assemble the service from its parts.
    pub async fn new(store: Arc<dyn JobStore>, logger: Arc<EventLogger>, metrics: MetricsAggregator) -> Result<Self> {
        Ok(Self {
            tracker: JobTracker::open(store).await?,
            logger,
            metrics,
        })
    }

    /// Open the persistent service rooted at `data_dir`.
    pub async fn open(data_dir: &Path) -> Result<Self> {
        let store = SqliteJobStore::new(&data_dir.join("jobs.db"))?;
        Self::new(
            Arc::new(store),
            Arc::new(EventLogger::new(data_dir.join("logs"))),
            MetricsAggregator::open(&data_dir.join("analytics").join("metrics.json")),
        )
        .await
    }

    /// Open the service at the locations named in `settings`.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let store = SqliteJobStore::new(&settings.jobs_db_path())?;
        Self::new(
            Arc::new(store),
            Arc::new(EventLogger::new(settings.logs_dir())),
            MetricsAggregator::open(&settings.metrics_path()),
        )
        .await
    }

    /// Non-persistent job records and metrics; events still go to `logs_dir`.
    pub async fn in_memory(logs_dir: &Path) -> Result<Self> {
        Self::new(
            Arc::new(MemoryJobStore::new()),
            Arc::new(EventLogger::new(logs_dir)),
            MetricsAggregator::in_memory(),
        )
        .await
    }

    /// Create a job and move it to Running at the first step.
    pub async fn start_job(&self, niche: &str, theme: &str) -> Result<String> {
        let job_id = self.tracker.create(niche, theme).await?;
        self.logger.log(
            LogLevel::Info,
            &format!("Started new job with ID: {}", job_id),
            Some(&job_id),
            Some(json!({ "niche": niche, "theme": theme })),
        );
        self.tracker
            .update_status(&job_id, JobStatus::Running, Some(JobStep::Init), None)
            .await?;
        Ok(job_id)
    }

    /// Apply a status change, log it, and record metrics for terminal jobs.
    pub async fn update_status(
        &self,
        job_id: &str,
        status: JobStatus,
        step: Option<JobStep>,
        error: Option<&str>,
    ) -> Result<()> {
        let applied = self
            .tracker
            .update_status(job_id, status, step, error.map(str::to_string))
            .await?;

        let Some(job) = applied else {
            match self.tracker.get(job_id).await {
                None => self.logger.error(
                    &format!("Cannot update status of unknown job {}", job_id),
                    Some(job_id),
                ),
                Some(current) => self.logger.warning(
                    &format!(
                        "Ignored status change of job {} from {} to {}",
                        job_id, current.status, status
                    ),
                    Some(job_id),
                ),
            }
            return Ok(());
        };

        match (error, step) {
            (Some(error), Some(step)) => self.logger.error(
                &format!("Job {} encountered an error in step {}: {}", job_id, step, error),
                Some(job_id),
            ),
            (Some(error), None) => self
                .logger
                .error(&format!("Job {} encountered an error: {}", job_id, error), Some(job_id)),
            (None, Some(step)) => self.logger.info(
                &format!("Job {} status updated to {} (step: {})", job_id, status, step),
                Some(job_id),
            ),
            (None, None) => self
                .logger
                .info(&format!("Job {} status updated to {}", job_id, status), Some(job_id)),
        }

        if job.status.is_terminal() {
            self.metrics.record(&job)?;
            if job.status == JobStatus::Completed {
                self.logger.info(&format!("Job {} completed successfully", job_id), Some(job_id));
            } else {
                self.logger.warning(&format!("Job {} failed", job_id), Some(job_id));
            }
        }
        Ok(())
    }

    pub async fn set_output_path(&self, job_id: &str, path: &str) -> Result<()> {
        if self.tracker.set_output_path(job_id, path).await? {
            self.logger
                .info(&format!("Job {} output set to {}", job_id, path), Some(job_id));
        } else {
            self.logger.error(
                &format!("Cannot set output path of unknown job {}", job_id),
                Some(job_id),
            );
        }
        Ok(())
    }

    /// Pick up jobs and metrics written by other processes.
    pub async fn refresh(&self) -> Result<()> {
        self.tracker.reload().await?;
        self.metrics.reload();
        Ok(())
    }

    pub async fn get_job(&self, job_id: &str) -> Option<Job> {
        self.tracker.get(job_id).await
    }

    /// All jobs, oldest first.
    pub async fn list_jobs(&self) -> Vec<Job> {
        self.tracker.list_all().await
    }

    /// Pending and running jobs.
    pub async fn active_jobs(&self) -> Vec<Job> {
        self.list_jobs().await.into_iter().filter(Job::is_active).collect()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn generate_report(&self) -> String {
        self.metrics.report()
    }

    pub fn log(&self, level: LogLevel, message: &str, job_id: Option<&str>, payload: Option<Value>) {
        self.logger.log(level, message, job_id, payload);
    }

    pub fn logger(&self) -> &Arc<EventLogger> {
        &self.logger
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn service(dir: &Path) -> MonitoringService {
        MonitoringService::in_memory(&dir.join("logs")).await.unwrap()
    }

    #[tokio::test]
    async fn test_start_job_is_running_at_init() {
        let dir = tempfile::tempdir().unwrap();
        let monitoring = service(dir.path()).await;

        let id = monitoring.start_job("motivational", "grit").await.unwrap();
        let job = monitoring.get_job(&id).await.unwrap();

        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.current_step, Some(JobStep::Init));
        assert_eq!(monitoring.active_jobs().await.len(), 1);
    }

    #[tokio::test]
    async fn test_terminal_update_records_metrics_once() {
        let dir = tempfile::tempdir().unwrap();
        let monitoring = service(dir.path()).await;
        let id = monitoring.start_job("motivational", "grit").await.unwrap();

        monitoring
            .update_status(&id, JobStatus::Failed, Some(JobStep::VideoEditing), Some("boom"))
            .await
            .unwrap();
        // A second terminal update is rejected and not counted.
        monitoring
            .update_status(&id, JobStatus::Completed, None, None)
            .await
            .unwrap();

        let metrics = monitoring.metrics();
        assert_eq!(metrics.total_jobs, 1);
        assert_eq!(metrics.failed_jobs, 1);

        let job = monitoring.get_job(&id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("boom"));
        assert!(job.end_time.is_some());
    }

    #[tokio::test]
    async fn test_events_reach_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let monitoring = service(dir.path()).await;
        let id = monitoring.start_job("motivational", "grit").await.unwrap();
        monitoring
            .update_status(&id, JobStatus::Running, Some(JobStep::VideoGeneration), None)
            .await
            .unwrap();
        monitoring.update_status(&id, JobStatus::Completed, None, None).await.unwrap();

        let messages: Vec<String> = monitoring
            .logger()
            .recent_entries(10)
            .into_iter()
            .map(|e| e.message)
            .collect();

        assert_eq!(messages[0], format!("Started new job with ID: {}", id));
        assert!(messages.contains(&format!(
            "Job {} status updated to running (step: video_generation)",
            id
        )));
        assert_eq!(messages.last().unwrap(), &format!("Job {} completed successfully", id));
    }

    #[tokio::test]
    async fn test_unknown_job_update_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let monitoring = service(dir.path()).await;
        monitoring
            .update_status("job_0_missing", JobStatus::Completed, None, None)
            .await
            .unwrap();
        monitoring.set_output_path("job_0_missing", "/x").await.unwrap();
        assert_eq!(monitoring.metrics().total_jobs, 0);

        let entries = monitoring.logger().recent_entries(10);
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.level == LogLevel::Error));
        assert_eq!(entries[0].message, "Cannot update status of unknown job job_0_missing");
        assert!(!entries.iter().any(|e| e.message.contains("status updated")));
    }

    #[tokio::test]
    async fn test_rejected_transition_is_not_logged_as_update() {
        let dir = tempfile::tempdir().unwrap();
        let monitoring = service(dir.path()).await;
        let id = monitoring.start_job("motivational", "grit").await.unwrap();
        monitoring.update_status(&id, JobStatus::Completed, None, None).await.unwrap();

        monitoring
            .update_status(&id, JobStatus::Running, Some(JobStep::FinalRender), None)
            .await
            .unwrap();

        let last = monitoring.logger().recent_entries(1).remove(0);
        assert_eq!(last.level, LogLevel::Warning);
        assert_eq!(
            last.message,
            format!("Ignored status change of job {} from completed to running", id)
        );
        assert_eq!(monitoring.get_job(&id).await.unwrap().status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_open_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let monitoring = MonitoringService::open(dir.path()).await.unwrap();
            let id = monitoring.start_job("motivational", "grit").await.unwrap();
            monitoring.update_status(&id, JobStatus::Completed, None, None).await.unwrap();
            id
        };

        let reopened = MonitoringService::open(dir.path()).await.unwrap();
        assert_eq!(reopened.get_job(&id).await.unwrap().status, JobStatus::Completed);
        assert_eq!(reopened.metrics().completed_jobs, 1);
    }
}
