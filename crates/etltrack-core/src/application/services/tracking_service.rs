use std::sync::Arc;

use chrono::{
    DateTime,
    Utc,
};

use crate::domain::{
    DomainResult,
    JobName,
    JobStatus,
    Run,
};
use crate::event::{
    CoreEvent,
    EventBus,
};
use crate::infrastructure::RunRegistry;

/// Ingress surface for the external execution engine. Applies each reported
/// event to the registry and notifies the event bus when state changed;
/// idempotent redeliveries emit nothing.
pub struct TrackingService {
    registry: Arc<RunRegistry>,
    event_bus: Arc<dyn EventBus>,
}

impl TrackingService {
    pub fn new(registry: Arc<RunRegistry>, event_bus: Arc<dyn EventBus>) -> Self {
        Self {
            registry,
            event_bus,
        }
    }

    pub async fn run_started(
        &self, run_id: &str, timestamp: DateTime<Utc>,
    ) -> DomainResult<Run> {
        match self.registry.record_run_started(run_id, timestamp) {
            Ok(run) => {
                tracing::debug!(run_id = %run_id, "Run started");
                self.event_bus
                    .emit(CoreEvent::RunStarted {
                        run_id: run_id.to_string(),
                        timestamp: timestamp.timestamp_millis(),
                    })
                    .await;
                Ok(run)
            }
            Err(e) => {
                tracing::warn!(run_id = %run_id, error = %e, "Rejected run-started event");
                Err(e)
            }
        }
    }

    pub async fn job_updated(
        &self, run_id: &str, job: JobName, status: JobStatus, duration_seconds: i64,
        records: i64, error: Option<String>,
    ) -> DomainResult<bool> {
        let outcome = match self.registry.record_job_event(
            run_id,
            job,
            status,
            duration_seconds,
            records,
            error,
        ) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(
                    run_id = %run_id,
                    job = %job,
                    requested = %status,
                    error = %e,
                    "Rejected job event"
                );
                return Err(e);
            }
        };

        if !outcome.changed {
            tracing::debug!(run_id = %run_id, job = %job, status = %status, "Duplicate job event absorbed");
            return Ok(false);
        }

        tracing::debug!(run_id = %run_id, job = %job, status = %status, "Job updated");
        self.event_bus
            .emit(CoreEvent::JobUpdated {
                run_id: run_id.to_string(),
                job,
                status,
            })
            .await;

        for skipped in outcome.skipped {
            self.event_bus
                .emit(CoreEvent::JobUpdated {
                    run_id: run_id.to_string(),
                    job: skipped,
                    status: JobStatus::Skipped,
                })
                .await;
        }

        Ok(true)
    }

    pub async fn run_finalized(
        &self, run_id: &str, timestamp: DateTime<Utc>,
    ) -> DomainResult<Run> {
        match self.registry.finalize_run(run_id, timestamp) {
            Ok(run) => {
                tracing::debug!(run_id = %run_id, status = %run.status, "Run finalized");
                self.event_bus
                    .emit(CoreEvent::RunFinalized {
                        run_id: run_id.to_string(),
                        status: run.status,
                        timestamp: timestamp.timestamp_millis(),
                    })
                    .await;
                Ok(run)
            }
            Err(e) => {
                tracing::warn!(run_id = %run_id, error = %e, "Rejected run-finalized event");
                Err(e)
            }
        }
    }
}
