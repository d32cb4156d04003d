//! In-memory job store.
//!
//! Useful for testing.

use super::JobStore;
use crate::error::Result;
use crate::monitoring::job::Job;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<String, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn persist(&self, job: &Job) -> Result<()> {
        let mut jobs = self.jobs.write().unwrap();
        jobs.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<Job>> {
        let jobs = self.jobs.read().unwrap();
        Ok(jobs.values().cloned().collect())
    }
}
