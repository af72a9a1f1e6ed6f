pub mod metrics_service;
pub mod query_service;
pub mod tracking_service;
