use thiserror::Error;

use super::run::{
    JobName,
    JobStatus,
    RunStatus,
};

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Run already exists: {0}")]
    DuplicateRun(String),

    #[error("Unknown run: {0}")]
    UnknownRun(String),

    #[error(
        "Invalid transition for job '{job}' in run '{run_id}': {current} -> {requested}"
    )]
    InvalidJobTransition {
        run_id: String,
        job: JobName,
        current: JobStatus,
        requested: JobStatus,
    },

    #[error("Invalid transition for run '{run_id}': {current} -> {requested}")]
    InvalidRunTransition {
        run_id: String,
        current: RunStatus,
        requested: RunStatus,
    },

    #[error("Run already finalized: {0}")]
    RunAlreadyFinalized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),
}

pub type DomainResult<T> = Result<T, DomainError>;
