use std::sync::Arc;

use crate::domain::{
    DomainResult,
    Job,
    Run,
    StatusFilter,
};
use crate::infrastructure::RunRegistry;

/// Read-only lookups over the registry. Never mutates, so any number of
/// these calls may run alongside writes to unrelated runs.
pub struct QueryService {
    registry: Arc<RunRegistry>,
}

impl QueryService {
    pub fn new(registry: Arc<RunRegistry>) -> Self {
        Self { registry }
    }

    /// Runs matching the search term (case-insensitive substring on the id)
    /// and status filter, most recent first. Ties on the start timestamp
    /// are broken by ascending id so the order is stable.
    pub fn list_runs(&self, search: Option<&str>, filter: StatusFilter) -> Vec<Run> {
        let needle = search.map(str::to_lowercase);

        let mut runs: Vec<Run> = self
            .registry
            .runs()
            .into_iter()
            .filter(|run| filter.matches(run.status))
            .filter(|run| {
                needle
                    .as_deref()
                    .map_or(true, |n| run.id.to_lowercase().contains(n))
            })
            .collect();

        runs.sort_by(|a, b| {
            b.started_at
                .cmp(&a.started_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        runs
    }

    pub fn get_run(&self, run_id: &str) -> DomainResult<Run> {
        self.registry.get_run(run_id)
    }

    /// Jobs of the named run in execution order.
    pub fn get_job_details(&self, run_id: &str) -> DomainResult<Vec<Job>> {
        self.registry.get_run(run_id).map(|run| run.jobs)
    }
}
