use thiserror::Error;

use crate::imagery::ImageryQuery;
use crate::raster::Band;

#[derive(Error, Debug)]
pub enum HydrosatError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid scene catalog: {0}")]
    InvalidCatalog(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(
        "No usable scenes for {query}; try widening the date window or raising the cloud limit"
    )]
    NoImagery { query: ImageryQuery },

    #[error("Region '{key}' not found (available: {available})")]
    UnknownRegion { key: String, available: String },

    #[error("Invalid period: start {start} is not before end {end}")]
    InvalidPeriod {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("Scene {scene} is missing band {band}")]
    MissingBand { scene: String, band: Band },

    #[error("Scene {scene} grid {found} does not match composite grid {expected}")]
    GridMismatch {
        scene: String,
        expected: String,
        found: String,
    },

    #[error("Band shape {found:?} does not match grid {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Imagery backend error: {0}")]
    Backend(String),

    #[error("Imagery backend did not answer within {seconds}s")]
    BackendTimeout { seconds: u64 },

    #[error("Period {period} failed: {source}")]
    PeriodFailed {
        period: u8,
        #[source]
        source: Box<HydrosatError>,
    },

    #[error("Dashboard refresh failed [{code}]: {message}")]
    RefreshFailed { code: String, message: String },

    #[error("Job {0} not found")]
    JobNotFound(String),

    #[error("Job exceeded its {seconds}s time limit")]
    JobTimeout { seconds: u64 },

    #[error("Job {id} failed [{code}]: {message}")]
    JobFailed {
        id: String,
        code: String,
        message: String,
    },

    #[error("Unknown job task '{0}'")]
    UnknownTask(String),
}

impl HydrosatError {
    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "IO_ERROR",
            Self::InvalidCatalog(_) => "INVALID_CATALOG",
            Self::Json(_) => "INVALID_JSON",
            Self::NoImagery { .. } => "NO_IMAGERY",
            Self::UnknownRegion { .. } => "UNKNOWN_REGION",
            Self::InvalidPeriod { .. } => "INVALID_PERIOD",
            Self::MissingBand { .. } => "MISSING_BAND",
            Self::GridMismatch { .. } | Self::ShapeMismatch { .. } => "GRID_MISMATCH",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Backend(_) => "BACKEND_ERROR",
            Self::BackendTimeout { .. } => "BACKEND_TIMEOUT",
            Self::PeriodFailed { source, .. } => source.code(),
            Self::RefreshFailed { .. } => "DASHBOARD_REFRESH_FAILED",
            Self::JobNotFound(_) => "JOB_NOT_FOUND",
            Self::JobTimeout { .. } => "JOB_TIMEOUT",
            Self::JobFailed { .. } => "JOB_FAILED",
            Self::UnknownTask(_) => "UNKNOWN_TASK",
        }
    }

    /// Message safe to show to end users. Backend and I/O internals are
    /// replaced by a generic description.
    pub fn safe_message(&self) -> String {
        match self {
            Self::Io(_) | Self::Json(_) | Self::InvalidCatalog(_) => {
                "The scene catalog could not be read".to_string()
            }
            Self::Backend(_) => "The imagery backend reported an error".to_string(),
            Self::PeriodFailed { period, source } => {
                format!("Period {period}: {}", source.safe_message())
            }
            Self::RefreshFailed { message, .. } | Self::JobFailed { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// True for conditions that are expected in normal operation and should
    /// be reported to the caller rather than logged as faults.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::NoImagery { .. }
            | Self::UnknownRegion { .. }
            | Self::InvalidPeriod { .. }
            | Self::InvalidConfig(_) => true,
            Self::PeriodFailed { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, HydrosatError>;
