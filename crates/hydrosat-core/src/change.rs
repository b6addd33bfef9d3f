//! Period-over-period comparison of classification results.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aggregate::round2;
use crate::classify::ParcelClass;
use crate::consts::{SIGNIFICANT_TREND_DELTA_PCT, SLIGHT_TREND_DELTA_PCT};
use crate::period::Period;
use crate::report::ClassificationResult;

/// Direction and size of the change in problematic area.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    SignificantWorsening,
    SlightWorsening,
    Stable,
    SlightImprovement,
    SignificantImprovement,
}

impl Trend {
    /// Classify a change in problematic share (percentage points).
    /// Magnitudes above 5 are significant, above 1 slight, the rest stable.
    pub fn from_delta(delta_pct: f64) -> Self {
        if delta_pct > SIGNIFICANT_TREND_DELTA_PCT {
            Self::SignificantWorsening
        } else if delta_pct > SLIGHT_TREND_DELTA_PCT {
            Self::SlightWorsening
        } else if delta_pct < -SIGNIFICANT_TREND_DELTA_PCT {
            Self::SignificantImprovement
        } else if delta_pct < -SLIGHT_TREND_DELTA_PCT {
            Self::SlightImprovement
        } else {
            Self::Stable
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::SignificantWorsening => "significant_worsening",
            Self::SlightWorsening => "slight_worsening",
            Self::Stable => "stable",
            Self::SlightImprovement => "slight_improvement",
            Self::SignificantImprovement => "significant_improvement",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::SignificantWorsening => "Significant increase in water-affected area",
            Self::SlightWorsening => "Slight increase in water-affected area",
            Self::Stable => "No significant change",
            Self::SlightImprovement => "Slight decrease in water-affected area",
            Self::SignificantImprovement => "Significant decrease in water-affected area",
        }
    }

    pub fn is_worsening(self) -> bool {
        matches!(self, Self::SignificantWorsening | Self::SlightWorsening)
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Area and share of one class in both periods.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassDelta {
    pub label: String,
    pub before_ha: f64,
    pub after_ha: f64,
    pub delta_ha: f64,
    pub before_pct: f64,
    pub after_pct: f64,
    pub delta_pct: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub code: Trend,
    pub description: String,
    /// Δ water % + Δ waterlogged %.
    pub total_delta_pct: f64,
}

/// Per-class differences between two classifications of one region.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeReport {
    pub region: String,
    pub period1: Period,
    pub period2: Period,
    pub classes: BTreeMap<ParcelClass, ClassDelta>,
    pub trend: TrendSummary,
}

impl ChangeReport {
    /// Compare `before` (period 1) with `after` (period 2). Both are expected
    /// to cover the same region; the report carries the region of `after`.
    pub fn between(before: &ClassificationResult, after: &ClassificationResult) -> Self {
        let classes: BTreeMap<ParcelClass, ClassDelta> = ParcelClass::ALL
            .into_iter()
            .map(|class| {
                let (before_ha, after_ha) = (before.hectares(class), after.hectares(class));
                let (before_pct, after_pct) = (before.percent(class), after.percent(class));
                let delta = ClassDelta {
                    label: class.label().to_string(),
                    before_ha,
                    after_ha,
                    delta_ha: round2(after_ha - before_ha),
                    before_pct,
                    after_pct,
                    delta_pct: round2(after_pct - before_pct),
                };
                (class, delta)
            })
            .collect();

        let delta_pct = |class: ParcelClass| classes.get(&class).map_or(0.0, |d| d.delta_pct);
        let total_delta_pct =
            round2(delta_pct(ParcelClass::SurfaceWater) + delta_pct(ParcelClass::Waterlogged));
        let trend = Trend::from_delta(total_delta_pct);

        info!(
            region = %after.region,
            period1 = %before.period,
            period2 = %after.period,
            total_delta_pct,
            trend = %trend,
            "Change detected"
        );

        Self {
            region: after.region.clone(),
            period1: before.period,
            period2: after.period,
            classes,
            trend: TrendSummary {
                code: trend,
                description: trend.description().to_string(),
                total_delta_pct,
            },
        }
    }

    pub fn delta(&self, class: ParcelClass) -> Option<&ClassDelta> {
        self.classes.get(&class)
    }
}
