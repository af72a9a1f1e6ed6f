pub mod application;
pub mod domain;
pub mod event;
pub mod infrastructure;
pub mod logging;

use std::sync::Arc;

pub use domain::{
    DomainError,
    DomainResult,
    Job,
    JobName,
    JobStatus,
    MetricsSnapshot,
    OverallKpis,
    Run,
    RunStatus,
    StatusDistribution,
    StatusFilter,
    Window,
};
pub use event::{
    CoreEvent,
    EventBus,
    NoOpEventBus,
};
pub use infrastructure::RunRegistry;

/// Composition root: one registry shared by the ingress service and the
/// two read-side services.
pub struct CoreContext {
    pub event_bus: Arc<dyn EventBus>,

    pub registry: Arc<RunRegistry>,

    pub tracking_service: Arc<application::TrackingService>,

    pub metrics_service: Arc<application::MetricsService>,

    pub query_service: Arc<application::QueryService>,
}

impl CoreContext {
    pub fn new(event_bus: Arc<dyn EventBus>) -> Self {
        let registry = Arc::new(RunRegistry::new());

        let tracking_service = Arc::new(application::TrackingService::new(
            Arc::clone(&registry),
            Arc::clone(&event_bus),
        ));
        let metrics_service = Arc::new(application::MetricsService::new(Arc::clone(&registry)));
        let query_service = Arc::new(application::QueryService::new(Arc::clone(&registry)));

        Self {
            event_bus,
            registry,
            tracking_service,
            metrics_service,
            query_service,
        }
    }
}
