pub mod services;

pub use services::metrics_service::MetricsService;
pub use services::query_service::QueryService;
pub use services::tracking_service::TrackingService;
