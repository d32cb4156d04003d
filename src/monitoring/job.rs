//! Job records and their lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Completed or Failed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether a job in this status may move to `next`.
    ///
    /// Running to Running is allowed so the current step can advance.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(format!("Unknown job status: {}", s)),
        }
    }
}

/// Pipeline steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStep {
    #[serde(rename = "initialization")]
    Init,
    VideoGeneration,
    ScriptGeneration,
    VoiceoverGeneration,
    MusicGeneration,
    VideoEditing,
    FinalRender,
}

impl JobStep {
    pub const ALL: [JobStep; 7] = [
        JobStep::Init,
        JobStep::VideoGeneration,
        JobStep::ScriptGeneration,
        JobStep::VoiceoverGeneration,
        JobStep::MusicGeneration,
        JobStep::VideoEditing,
        JobStep::FinalRender,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStep::Init => "initialization",
            JobStep::VideoGeneration => "video_generation",
            JobStep::ScriptGeneration => "script_generation",
            JobStep::VoiceoverGeneration => "voiceover_generation",
            JobStep::MusicGeneration => "music_generation",
            JobStep::VideoEditing => "video_editing",
            JobStep::FinalRender => "final_render",
        }
    }
}

impl std::fmt::Display for JobStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStep::ALL
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| format!("Unknown job step: {}", s))
    }
}

/// One video generation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub niche: String,
    pub theme: String,
    pub start_time: DateTime<Utc>,
    /// Set exactly when the status is terminal.
    pub end_time: Option<DateTime<Utc>>,
    pub status: JobStatus,
    /// Only set while running.
    pub current_step: Option<JobStep>,
    pub error: Option<String>,
    pub output_path: Option<String>,
}

impl Job {
    /// Create a pending job starting now.
    pub fn new(niche: &str, theme: &str) -> Self {
        Self {
            id: new_job_id(),
            niche: niche.to_string(),
            theme: theme.to_string(),
            start_time: Utc::now(),
            end_time: None,
            status: JobStatus::Pending,
            current_step: None,
            error: None,
            output_path: None,
        }
    }

    /// Processing time in milliseconds, once terminal.
    pub fn duration_ms(&self) -> Option<i64> {
        self.end_time
            .map(|end| (end - self.start_time).num_milliseconds())
    }

    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }
}

/// Generate a job id: `job_<unix millis>_<random suffix>`.
pub fn new_job_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("job_{}_{}", Utc::now().timestamp_millis(), &suffix[..12])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_thousand_ids_are_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| new_job_id()).collect();
        assert_eq!(ids.len(), 1000);
        assert!(ids.iter().all(|id| id.starts_with("job_")));
    }

    #[test]
    fn test_transitions() {
        use JobStatus::*;
        assert!(Pending.can_transition_to(Running));
        assert!(Running.can_transition_to(Running));
        assert!(Running.can_transition_to(Failed));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Running));
    }

    #[test]
    fn test_step_strings_round_trip() {
        for step in JobStep::ALL {
            assert_eq!(step.as_str().parse::<JobStep>().unwrap(), step);
            assert_eq!(serde_json::to_string(&step).unwrap(), format!("\"{}\"", step.as_str()));
        }
        assert!("rendering".parse::<JobStep>().is_err());
    }

    #[test]
    fn test_steps_are_ordered() {
        assert!(JobStep::Init < JobStep::VideoGeneration);
        assert!(JobStep::VideoEditing < JobStep::FinalRender);
    }
}
