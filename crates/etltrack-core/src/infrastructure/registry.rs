use chrono::{
    DateTime,
    Utc,
};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::{
    validate_job_figures,
    validate_run_id,
    DomainError,
    DomainResult,
    Job,
    JobName,
    JobStatus,
    Run,
    RunStatus,
};

/// Result of applying a job event: whether any state changed and which
/// later jobs were cascaded to `Skipped` as a consequence.
#[derive(Debug, Default)]
pub struct JobEventOutcome {
    pub changed: bool,
    pub skipped: Vec<JobName>,
}

/// In-memory authoritative store for runs and their jobs. Mutation is
/// serialized per run id by the map's entry locking; readers clone entries
/// out, so they observe a run either before or after a write, never torn.
pub struct RunRegistry {
    runs: DashMap<String, Run>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self {
            runs: DashMap::new(),
        }
    }

    pub fn record_run_started(
        &self, run_id: &str, started_at: DateTime<Utc>,
    ) -> DomainResult<Run> {
        validate_run_id(run_id)?;

        match self.runs.entry(run_id.to_string()) {
            Entry::Occupied(_) => Err(DomainError::DuplicateRun(run_id.to_string())),
            Entry::Vacant(vacant) => {
                let run = Run::new(run_id.to_string(), started_at);
                vacant.insert(run.clone());
                Ok(run)
            }
        }
    }

    pub fn record_job_event(
        &self, run_id: &str, name: JobName, status: JobStatus, duration_seconds: i64,
        records: i64, error: Option<String>,
    ) -> DomainResult<JobEventOutcome> {
        validate_job_figures(duration_seconds, records)?;

        let mut entry = self
            .runs
            .get_mut(run_id)
            .ok_or_else(|| DomainError::UnknownRun(run_id.to_string()))?;
        let run = entry.value_mut();

        match run.jobs.iter().position(|j| j.name == name) {
            Some(idx) => {
                let current = run.jobs[idx].status;

                // At-least-once delivery upstream: an echo of the status a
                // job already holds is absorbed without touching state.
                if current == status {
                    return Ok(JobEventOutcome::default());
                }

                if run.status.is_terminal() {
                    return Err(DomainError::RunAlreadyFinalized(run_id.to_string()));
                }

                if status == JobStatus::Skipped || !current.can_transition_to(status) {
                    return Err(DomainError::InvalidJobTransition {
                        run_id: run_id.to_string(),
                        job: name,
                        current,
                        requested: status,
                    });
                }

                let job = &mut run.jobs[idx];
                job.status = status;
                job.duration_seconds = duration_seconds;
                job.records = records;
                job.error = error;

                let skipped = if status == JobStatus::Failed {
                    skip_following_jobs(run, idx)
                } else {
                    Vec::new()
                };

                Ok(JobEventOutcome {
                    changed: true,
                    skipped,
                })
            }
            None => {
                if run.status.is_terminal() {
                    return Err(DomainError::RunAlreadyFinalized(run_id.to_string()));
                }

                if run.any_job_failed() {
                    return Err(DomainError::InvalidEvent(format!(
                        "Job '{}' cannot be added to run '{}' after an earlier job failed",
                        name, run_id
                    )));
                }

                // A fresh job is implicitly queued; it may only arrive in a
                // state reachable from there.
                if !matches!(status, JobStatus::Queued | JobStatus::Running) {
                    return Err(DomainError::InvalidJobTransition {
                        run_id: run_id.to_string(),
                        job: name,
                        current: JobStatus::Queued,
                        requested: status,
                    });
                }

                run.jobs.push(Job {
                    name,
                    status,
                    duration_seconds,
                    records,
                    error,
                });

                Ok(JobEventOutcome {
                    changed: true,
                    skipped: Vec::new(),
                })
            }
        }
    }

    pub fn finalize_run(
        &self, run_id: &str, concluded_at: DateTime<Utc>,
    ) -> DomainResult<Run> {
        let mut entry = self
            .runs
            .get_mut(run_id)
            .ok_or_else(|| DomainError::UnknownRun(run_id.to_string()))?;
        let run = entry.value_mut();

        if run.status.is_terminal() {
            return Err(DomainError::RunAlreadyFinalized(run_id.to_string()));
        }

        if concluded_at < run.started_at {
            return Err(DomainError::InvalidEvent(format!(
                "Run '{}' cannot conclude before it started",
                run_id
            )));
        }

        let target = if run.any_job_failed() {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };

        if !run.all_jobs_terminal() {
            return Err(DomainError::InvalidRunTransition {
                run_id: run_id.to_string(),
                current: run.status,
                requested: target,
            });
        }

        run.status = target;
        run.concluded_at = Some(concluded_at);

        match target {
            RunStatus::Failed => {
                if run.error.is_none() {
                    let attributed = run.first_failure().map(|job| {
                        job.error
                            .clone()
                            .unwrap_or_else(|| format!("Job '{}' failed", job.name))
                    });
                    run.error = attributed;
                }
                run.records_processed = 0;
            }
            _ => {
                // Records that made it through the whole pipeline: the
                // figure reported by the final stage.
                run.records_processed = run.jobs.last().map(|j| j.records).unwrap_or(0);
            }
        }

        Ok(run.clone())
    }

    pub fn get_run(&self, run_id: &str) -> DomainResult<Run> {
        self.runs
            .get(run_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| DomainError::NotFound(run_id.to_string()))
    }

    /// Copy-on-read snapshot of every run, for aggregation and listing.
    pub fn runs(&self) -> Vec<Run> {
        self.runs.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

impl Default for RunRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// Only queued jobs are skippable; a job already running is being
// attempted and reports its own completion or failure.
fn skip_following_jobs(run: &mut Run, failed_idx: usize) -> Vec<JobName> {
    let mut skipped = Vec::new();
    for job in run.jobs.iter_mut().skip(failed_idx + 1) {
        if job.status == JobStatus::Queued {
            job.status = JobStatus::Skipped;
            skipped.push(job.name);
        }
    }
    skipped
}
