//! SQLite-based job store.

use super::JobStore;
use crate::error::{Result, SofyError};
use crate::monitoring::job::{Job, JobStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument, warn};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS jobs (
        id TEXT PRIMARY KEY,
        niche TEXT NOT NULL,
        theme TEXT NOT NULL,
        start_time TEXT NOT NULL,
        end_time TEXT,
        status TEXT NOT NULL,
        current_step TEXT,
        error TEXT,
        output_path TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_jobs_start_time ON jobs(start_time);
"#;

/// SQLite-based job store.
pub struct SqliteJobStore {
    conn: Mutex<Connection>,
}

impl SqliteJobStore {
    /// Open (or create) the job database at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized job store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| SofyError::Service(format!("Failed to acquire lock: {}", e)))
    }

    fn parse_time(value: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    fn row_to_job(row: &Row<'_>) -> rusqlite::Result<Option<Job>> {
        let id: String = row.get(0)?;
        let start_time: String = row.get(3)?;
        let end_time: Option<String> = row.get(4)?;
        let status: String = row.get(5)?;
        let current_step: Option<String> = row.get(6)?;

        let (Some(start_time), Ok(status)) = (Self::parse_time(&start_time), status.parse::<JobStatus>()) else {
            warn!("Skipping unreadable job record {}", id);
            return Ok(None);
        };

        Ok(Some(Job {
            id,
            niche: row.get(1)?,
            theme: row.get(2)?,
            start_time,
            end_time: end_time.as_deref().and_then(Self::parse_time),
            status,
            current_step: current_step.and_then(|s| s.parse().ok()),
            error: row.get(7)?,
            output_path: row.get(8)?,
        }))
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    #[instrument(skip(self, job), fields(job_id = %job.id))]
    async fn persist(&self, job: &Job) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            r#"
            INSERT OR REPLACE INTO jobs
            (id, niche, theme, start_time, end_time, status, current_step, error, output_path)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                job.id,
                job.niche,
                job.theme,
                job.start_time.to_rfc3339(),
                job.end_time.map(|dt| dt.to_rfc3339()),
                job.status.as_str(),
                job.current_step.map(|s| s.as_str()),
                job.error,
                job.output_path,
            ],
        )?;

        debug!("Persisted job {} ({})", job.id, job.status);
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<Job>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, niche, theme, start_time, end_time, status, current_step, error, output_path
            FROM jobs
            ORDER BY start_time ASC
            "#,
        )?;

        let rows = stmt.query_map([], Self::row_to_job)?;
        let mut jobs = Vec::new();
        for row in rows {
            if let Some(job) = row? {
                jobs.push(job);
            }
        }
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::job::JobStep;

    #[tokio::test]
    async fn test_reload_reproduces_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.db");

        let mut job = Job::new("motivational", "grit");
        job.status = JobStatus::Failed;
        job.end_time = Some(job.start_time + chrono::Duration::milliseconds(1234));
        job.error = Some("Step video_editing failed: boom".into());
        job.output_path = Some("/tmp/out/final_video.mp4".into());

        let mut running = Job::new("fitness", "strength");
        running.status = JobStatus::Running;
        running.current_step = Some(JobStep::MusicGeneration);

        {
            let store = SqliteJobStore::new(&path).unwrap();
            store.persist(&job).await.unwrap();
            store.persist(&running).await.unwrap();
        }

        let reopened = SqliteJobStore::new(&path).unwrap();
        let loaded = reopened.load_all().await.unwrap();

        assert_eq!(loaded.len(), 2);
        let reloaded = loaded.iter().find(|j| j.id == job.id).unwrap();
        assert_eq!(reloaded, &job);
        let reloaded_running = loaded.iter().find(|j| j.id == running.id).unwrap();
        assert_eq!(reloaded_running, &running);
    }

    #[tokio::test]
    async fn test_persist_replaces_record() {
        let store = SqliteJobStore::in_memory().unwrap();
        let mut job = Job::new("motivational", "grit");
        store.persist(&job).await.unwrap();

        job.status = JobStatus::Running;
        job.current_step = Some(JobStep::Init);
        store.persist(&job).await.unwrap();

        let loaded = store.load_all().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].status, JobStatus::Running);
    }
}
