//! Result records returned to callers.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::aggregate::AreaReport;
use crate::classify::{ClassificationThresholds, ParcelClass};
use crate::composite::CompositeMethod;
use crate::error::HydrosatError;
use crate::period::Period;
use crate::raster::ProductLevel;
use crate::region::Watershed;

/// Parameters a classification ran with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunParameters {
    pub max_cloud_pct: f32,
    pub method: CompositeMethod,
    pub product: ProductLevel,
    pub sensor: String,
    pub thresholds: ClassificationThresholds,
}

/// Outcome of classifying one region over one period.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub region: String,
    pub period: Period,
    /// Surveyed area of the region, when known.
    pub region_area_ha: Option<f64>,
    #[serde(flatten)]
    pub areas: AreaReport,
    pub images_processed: usize,
    pub acquisition_dates: Vec<NaiveDate>,
    pub parameters: RunParameters,
}

impl ClassificationResult {
    pub fn percent(&self, class: ParcelClass) -> f64 {
        self.areas.percent(class)
    }

    pub fn hectares(&self, class: ParcelClass) -> f64 {
        self.areas.hectares(class)
    }

    pub fn problematic_pct(&self) -> f64 {
        self.areas.summary.problematic_pct
    }
}

/// One row of the cross-watershed ranking.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub watershed: Watershed,
    pub problematic_pct: f64,
    pub waterlogged_ha: f64,
}

/// A watershed left out of a cross-watershed pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkippedWatershed {
    pub watershed: Watershed,
    pub code: String,
    pub message: String,
}

impl SkippedWatershed {
    pub fn new(watershed: Watershed, error: &HydrosatError) -> Self {
        Self {
            watershed,
            code: error.code().to_string(),
            message: error.safe_message(),
        }
    }
}

/// Classification of every watershed for one period.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WatershedReport {
    pub period: Period,
    pub watersheds: BTreeMap<Watershed, ClassificationResult>,
    /// Most problematic first.
    pub ranking: Vec<RankingEntry>,
    pub skipped: Vec<SkippedWatershed>,
}

impl WatershedReport {
    pub fn new(
        period: Period,
        watersheds: BTreeMap<Watershed, ClassificationResult>,
        skipped: Vec<SkippedWatershed>,
    ) -> Self {
        let mut ranking: Vec<RankingEntry> = watersheds
            .iter()
            .map(|(w, result)| RankingEntry {
                watershed: *w,
                problematic_pct: result.problematic_pct(),
                waterlogged_ha: result.areas.summary.waterlogged_ha,
            })
            .collect();
        ranking.sort_by(|a, b| b.problematic_pct.total_cmp(&a.problematic_pct));
        Self {
            period,
            watersheds,
            ranking,
            skipped,
        }
    }
}
