use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::ClassStats;
use crate::alerts::Alert;
use crate::classify::{ClassificationThresholds, ParcelClass};
use crate::composite::CompositeMethod;
use crate::period::Period;
use crate::region::RegionSelector;
use crate::report::{RankingEntry, SkippedWatershed};

/// Pipeline processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Compositing,
    ComputingIndices,
    Classifying,
    Aggregating,
    ComparingPeriods,
    GeneratingAlerts,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Compositing => write!(f, "Compositing"),
            Self::ComputingIndices => write!(f, "Computing spectral indices"),
            Self::Classifying => write!(f, "Classifying parcels"),
            Self::Aggregating => write!(f, "Aggregating areas"),
            Self::ComparingPeriods => write!(f, "Comparing periods"),
            Self::GeneratingAlerts => write!(f, "Generating alerts"),
        }
    }
}

/// Thread-safe progress reporting for the monitoring pipeline.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new pipeline stage has started. `total_items` is the number of
    /// work items in this stage (e.g., watershed count), if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// One work item within the current stage has completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// No-op progress reporter.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// One classification run. Unset options fall back to the service
/// configuration.
#[derive(Clone, Debug)]
pub struct ClassificationRequest {
    pub region: RegionSelector,
    pub period: Period,
    pub max_cloud_pct: Option<f32>,
    pub method: Option<CompositeMethod>,
    pub thresholds: Option<ClassificationThresholds>,
    pub vectorize: bool,
}

impl ClassificationRequest {
    pub fn new(region: RegionSelector, period: Period) -> Self {
        Self {
            region,
            period,
            max_cloud_pct: None,
            method: None,
            thresholds: None,
            vectorize: false,
        }
    }

    pub fn with_max_cloud(mut self, pct: f32) -> Self {
        self.max_cloud_pct = Some(pct);
        self
    }

    pub fn with_method(mut self, method: CompositeMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn with_thresholds(mut self, thresholds: ClassificationThresholds) -> Self {
        self.thresholds = Some(thresholds);
        self
    }

    pub fn with_vectors(mut self) -> Self {
        self.vectorize = true;
        self
    }
}

/// Overall condition of the consortium zone.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneralState {
    pub area_total_ha: f64,
    pub productive_ha: f64,
    pub problematic_ha: f64,
    pub problematic_pct: f64,
    pub images_processed: usize,
    pub approximate: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SummaryPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days: i64,
}

/// Dashboard payload: zone state, top alerts and watershed ranking.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub general_state: GeneralState,
    pub class_breakdown: BTreeMap<ParcelClass, ClassStats>,
    pub top_alerts: Vec<Alert>,
    pub total_alert_count: usize,
    pub watershed_ranking: Vec<RankingEntry>,
    pub skipped: Vec<SkippedWatershed>,
    pub period: SummaryPeriod,
    pub generated_at: DateTime<Utc>,
}
