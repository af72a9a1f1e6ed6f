use std::fmt;

use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(RunStatus::Queued),
            "running" => Ok(RunStatus::Running),
            "completed" => Ok(RunStatus::Completed),
            "failed" => Ok(RunStatus::Failed),
            _ => Err(format!("Unknown run status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Skipped
        )
    }

    /// Transitions an external job event may request. `Skipped` is never
    /// reachable this way; it is only assigned by the failure cascade.
    pub fn can_transition_to(&self, requested: JobStatus) -> bool {
        matches!(
            (self, requested),
            (JobStatus::Queued, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "skipped" => Ok(JobStatus::Skipped),
            _ => Err(format!("Unknown job status: {}", s)),
        }
    }
}

/// Pipeline stages in execution order. The derived `Ord` is the
/// name-sequence position used to attribute a run error when several jobs
/// fail: the earliest stage wins.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum JobName {
    Extract,
    Transform,
    Load,
}

impl JobName {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobName::Extract => "extract",
            JobName::Transform => "transform",
            JobName::Load => "load",
        }
    }
}

impl fmt::Display for JobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "extract" => Ok(JobName::Extract),
            "transform" => Ok(JobName::Transform),
            "load" => Ok(JobName::Load),
            _ => Err(format!("Unknown job name: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub name: JobName,
    pub status: JobStatus,
    pub duration_seconds: i64,
    pub records: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub concluded_at: Option<DateTime<Utc>>,
    pub records_processed: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub jobs: Vec<Job>,
}

impl Run {
    pub fn new(id: String, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            status: RunStatus::Running,
            started_at,
            concluded_at: None,
            records_processed: 0,
            error: None,
            jobs: Vec::new(),
        }
    }

    pub fn duration_seconds(&self) -> Option<i64> {
        self.concluded_at
            .map(|end| (end - self.started_at).num_seconds())
    }

    pub fn job(&self, name: JobName) -> Option<&Job> {
        self.jobs.iter().find(|j| j.name == name)
    }

    pub fn any_job_failed(&self) -> bool {
        self.jobs.iter().any(|j| j.status == JobStatus::Failed)
    }

    pub fn all_jobs_terminal(&self) -> bool {
        self.jobs.iter().all(|j| j.status.is_terminal())
    }

    /// Failed job with the earliest stage position; source of the run error.
    pub fn first_failure(&self) -> Option<&Job> {
        self.jobs
            .iter()
            .filter(|j| j.status == JobStatus::Failed)
            .min_by_key(|j| j.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Only(RunStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: RunStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }
}

impl std::str::FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            Ok(StatusFilter::All)
        } else {
            s.parse::<RunStatus>().map(StatusFilter::Only)
        }
    }
}
