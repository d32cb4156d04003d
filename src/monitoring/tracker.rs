//! In-memory job registry with write-through persistence.

use super::job::{Job, JobStatus, JobStep};
use super::store::JobStore;
use crate::error::Result;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Tracks every job known to this process.
///
/// All mutations take the write lock for the duration of the store write, so
/// records reach the backend in the order they were applied.
pub struct JobTracker {
    jobs: RwLock<HashMap<String, Job>>,
    store: Arc<dyn JobStore>,
}

impl JobTracker {
    /// Create a tracker, loading previously persisted jobs.
    pub async fn open(store: Arc<dyn JobStore>) -> Result<Self> {
        let loaded = store.load_all().await?;
        info!("Loaded {} job records", loaded.len());

        let jobs = loaded.into_iter().map(|job| (job.id.clone(), job)).collect();
        Ok(Self {
            jobs: RwLock::new(jobs),
            store,
        })
    }

    /// Replace the in-memory view with what the store holds now.
    ///
    /// Lets a reader in another process pick up jobs written since it opened.
    pub async fn reload(&self) -> Result<usize> {
        let mut jobs = self.jobs.write().await;
        let loaded = self.store.load_all().await?;
        *jobs = loaded.into_iter().map(|job| (job.id.clone(), job)).collect();
        Ok(jobs.len())
    }

    /// Register a new pending job and return its id.
    pub async fn create(&self, niche: &str, theme: &str) -> Result<String> {
        let job = Job::new(niche, theme);
        let id = job.id.clone();

        let mut jobs = self.jobs.write().await;
        self.store.persist(&job).await?;
        jobs.insert(id.clone(), job);

        debug!("Created job {}", id);
        Ok(id)
    }

    /// Apply a status change.
    ///
    /// Returns the updated job, or `None` when the id is unknown or the
    /// transition is not allowed. Neither case is an error.
    pub async fn update_status(
        &self,
        job_id: &str,
        status: JobStatus,
        step: Option<JobStep>,
        error: Option<String>,
    ) -> Result<Option<Job>> {
        let mut jobs = self.jobs.write().await;

        let Some(current) = jobs.get(job_id) else {
            warn!("Job {} not found", job_id);
            return Ok(None);
        };

        if !current.status.can_transition_to(status) {
            warn!(
                "Ignoring transition of job {} from {} to {}",
                job_id, current.status, status
            );
            return Ok(None);
        }

        let mut updated = current.clone();
        updated.status = status;
        if status.is_terminal() {
            updated.end_time = Some(Utc::now());
            updated.current_step = None;
        } else if step.is_some() {
            updated.current_step = step;
        }
        if let Some(error) = error {
            updated.error = Some(error);
        }

        self.store.persist(&updated).await?;
        jobs.insert(job_id.to_string(), updated.clone());
        Ok(Some(updated))
    }

    /// Record the artifact produced by a job.
    pub async fn set_output_path(&self, job_id: &str, path: &str) -> Result<bool> {
        let mut jobs = self.jobs.write().await;

        let Some(current) = jobs.get(job_id) else {
            warn!("Job {} not found", job_id);
            return Ok(false);
        };

        let mut updated = current.clone();
        updated.output_path = Some(path.to_string());

        self.store.persist(&updated).await?;
        jobs.insert(job_id.to_string(), updated);
        Ok(true)
    }

    pub async fn get(&self, job_id: &str) -> Option<Job> {
        self.jobs.read().await.get(job_id).cloned()
    }

    /// All jobs, oldest first.
    pub async fn list_all(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.id.cmp(&b.id)));
        jobs
    }
}
