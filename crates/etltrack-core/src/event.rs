use async_trait::async_trait;
use serde::{
    Deserialize,
    Serialize,
};

use crate::domain::{
    JobName,
    JobStatus,
    RunStatus,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    RunStarted {
        run_id: String,
        timestamp: i64,
    },

    JobUpdated {
        run_id: String,
        job: JobName,
        status: JobStatus,
    },

    RunFinalized {
        run_id: String,
        status: RunStatus,
        timestamp: i64,
    },
}

impl CoreEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            CoreEvent::RunStarted { .. } => "run-started",
            CoreEvent::JobUpdated { .. } => "job-updated",
            CoreEvent::RunFinalized { .. } => "run-finalized",
        }
    }

    pub fn to_json_payload(&self) -> serde_json::Value {
        match self {
            CoreEvent::RunStarted { run_id, timestamp } => serde_json::json!({
                "runId": run_id,
                "timestamp": timestamp,
            }),
            CoreEvent::JobUpdated {
                run_id,
                job,
                status,
            } => serde_json::json!({
                "runId": run_id,
                "job": job.as_str(),
                "status": status.as_str(),
            }),
            CoreEvent::RunFinalized {
                run_id,
                status,
                timestamp,
            } => serde_json::json!({
                "runId": run_id,
                "status": status.as_str(),
                "timestamp": timestamp,
            }),
        }
    }
}

#[async_trait]
pub trait EventBus: Send + Sync {
    async fn emit(&self, event: CoreEvent);
}

pub struct NoOpEventBus;

#[async_trait]
impl EventBus for NoOpEventBus {
    async fn emit(&self, _event: CoreEvent) {}
}
