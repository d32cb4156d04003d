//! Running job statistics.

use super::job::{Job, JobStatus};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Aggregate statistics over terminal jobs.
///
/// Serialized with the same field names as the metrics file written by
/// earlier releases, so existing files keep loading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub total_jobs: u64,
    pub completed_jobs: u64,
    pub failed_jobs: u64,
    /// Milliseconds.
    pub average_processing_time: f64,
    /// Percentage of total jobs that completed.
    pub success_rate: f64,
    pub jobs_by_niche: BTreeMap<String, u64>,
    /// Average milliseconds per niche.
    #[serde(rename = "processingTimeByNiche")]
    pub average_time_by_niche: BTreeMap<String, f64>,
    /// Terminal jobs per niche, the sample count behind `average_time_by_niche`.
    #[serde(default)]
    pub terminal_jobs_by_niche: BTreeMap<String, u64>,
}

impl MetricsSnapshot {
    /// Niches ordered by job count, highest first.
    pub fn top_niches(&self, limit: usize) -> Vec<(String, u64)> {
        let mut niches: Vec<(String, u64)> = self
            .jobs_by_niche
            .iter()
            .map(|(niche, count)| (niche.clone(), *count))
            .collect();
        niches.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        niches.truncate(limit);
        niches
    }

    /// Fill missing per-niche sample counts from files that predate them.
    fn backfill_terminal_counts(&mut self) {
        for (niche, count) in &self.jobs_by_niche {
            self.terminal_jobs_by_niche.entry(niche.clone()).or_insert(*count);
        }
    }

    /// Human-readable report.
    pub fn report(&self) -> String {
        let mut report = String::from("=== SOFY Analytics Report ===\n\n");

        report.push_str(&format!("Total Jobs: {}\n", self.total_jobs));
        report.push_str(&format!("Completed Jobs: {}\n", self.completed_jobs));
        report.push_str(&format!("Failed Jobs: {}\n", self.failed_jobs));
        report.push_str(&format!("Success Rate: {:.2}%\n", self.success_rate));
        report.push_str(&format!(
            "Average Processing Time: {:.2} seconds\n\n",
            self.average_processing_time / 1000.0
        ));

        report.push_str("=== Jobs by Niche ===\n");
        for (niche, count) in &self.jobs_by_niche {
            report.push_str(&format!("{}: {} jobs\n", niche, count));
        }

        report.push_str("\n=== Average Processing Time by Niche ===\n");
        for (niche, ms) in &self.average_time_by_niche {
            report.push_str(&format!("{}: {:.2} seconds\n", niche, ms / 1000.0));
        }

        report
    }
}

/// Maintains a [`MetricsSnapshot`] and persists it after every update.
pub struct MetricsAggregator {
    path: Option<PathBuf>,
    snapshot: Mutex<MetricsSnapshot>,
}

impl MetricsAggregator {
    /// Load metrics from `path`, starting empty if the file is missing or unreadable.
    pub fn open(path: &Path) -> Self {
        Self {
            path: Some(path.to_path_buf()),
            snapshot: Mutex::new(Self::read(path).unwrap_or_default()),
        }
    }

    fn read(path: &Path) -> Option<MetricsSnapshot> {
        let content = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str::<MetricsSnapshot>(&content) {
            Ok(mut snapshot) => {
                snapshot.backfill_terminal_counts();
                Some(snapshot)
            }
            Err(e) => {
                warn!("Error loading metrics from {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Re-read the metrics file, keeping the current values if it cannot be read.
    pub fn reload(&self) {
        let Some(snapshot) = self.path.as_deref().and_then(Self::read) else {
            return;
        };
        *self.snapshot.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = snapshot;
    }

    /// Metrics that are never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            snapshot: Mutex::new(MetricsSnapshot::default()),
        }
    }

    /// Fold a terminal job into the statistics and persist them.
    ///
    /// Jobs that are not terminal, or have no end time, are ignored.
    pub fn record(&self, job: &Job) -> Result<()> {
        let Some(duration_ms) = job.duration_ms().filter(|_| job.status.is_terminal()) else {
            warn!("Not recording metrics for non-terminal job {}", job.id);
            return Ok(());
        };
        let sample = duration_ms.max(0) as f64;

        let mut guard = self.snapshot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // Other processes may have recorded jobs since this one last read the file.
        if let Some(on_disk) = self.path.as_deref().and_then(Self::read) {
            *guard = on_disk;
        }
        let m = &mut *guard;

        m.total_jobs += 1;
        *m.jobs_by_niche.entry(job.niche.clone()).or_insert(0) += 1;
        match job.status {
            JobStatus::Completed => m.completed_jobs += 1,
            _ => m.failed_jobs += 1,
        }

        let n = (m.completed_jobs + m.failed_jobs) as f64;
        m.average_processing_time = (m.average_processing_time * (n - 1.0) + sample) / n;

        let niche_n = m.terminal_jobs_by_niche.entry(job.niche.clone()).or_insert(0);
        *niche_n += 1;
        let niche_n = *niche_n as f64;
        let niche_avg = m.average_time_by_niche.entry(job.niche.clone()).or_insert(0.0);
        *niche_avg = (*niche_avg * (niche_n - 1.0) + sample) / niche_n;

        m.success_rate = if m.total_jobs > 0 {
            m.completed_jobs as f64 / m.total_jobs as f64 * 100.0
        } else {
            0.0
        };

        debug!("Recorded {} job {} ({} ms)", job.status, job.id, duration_ms);
        self.save(m)
    }

    fn save(&self, snapshot: &MetricsSnapshot) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)?;

        // Readers see either the previous file or the new one, never a partial write.
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(serde_json::to_string_pretty(snapshot)?.as_bytes())?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// An independent copy of the current statistics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn report(&self) -> String {
        self.snapshot().report()
    }
}
