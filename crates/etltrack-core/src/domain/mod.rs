pub mod error;
pub mod metrics;
pub mod run;
pub mod validation;

pub use error::{
    DomainError,
    DomainResult,
};
pub use metrics::{
    BucketMetrics,
    BucketSpan,
    MetricsSnapshot,
    OverallKpis,
    StatusDistribution,
    Window,
};
pub use run::{
    Job,
    JobName,
    JobStatus,
    Run,
    RunStatus,
    StatusFilter,
};
pub use validation::{
    validate_job_figures,
    validate_run_id,
};
