//! Durable storage for job records.
//!
//! One record per job, keyed by id. Writes replace the whole record.

mod memory;
mod sqlite;

pub use memory::MemoryJobStore;
pub use sqlite::SqliteJobStore;

use super::job::Job;
use crate::error::Result;
use async_trait::async_trait;

/// Trait for job record backends.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert or replace a job record.
    async fn persist(&self, job: &Job) -> Result<()>;

    /// Load every stored job.
    async fn load_all(&self) -> Result<Vec<Job>>;
}
