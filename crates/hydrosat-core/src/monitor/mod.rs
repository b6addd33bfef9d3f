//! Service layer tying compositing, classification, aggregation, change
//! detection and alerting together.

pub mod config;
pub mod service;
pub mod types;

pub use config::{DashboardConfig, ImageryConfig, JobConfig, MonitorConfig};
pub use service::MonitoringService;
pub use types::{
    ClassificationRequest, DashboardSummary, GeneralState, NoOpReporter, PipelineStage,
    ProgressReporter, SummaryPeriod,
};
