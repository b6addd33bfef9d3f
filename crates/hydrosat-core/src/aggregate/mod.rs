//! Per-class area statistics and optional vector output.

pub mod area;
pub mod vectorize;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::classify::{ClassMap, ParcelClass};
use crate::consts::{DEFAULT_MAX_PIXELS, DEFAULT_MAX_VECTOR_FEATURES, DEFAULT_SIMPLIFY_TOLERANCE};
use crate::error::{HydrosatError, Result};
use crate::region::Region;

pub use area::{class_areas, sampling_stride, ClassAreas};
pub use vectorize::{
    label_components, vectorize, ClassComponent, Feature, FeatureCollection, VectorOmission,
    Vectorized,
};

/// Limits for the area reducer and vectoriser.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationOptions {
    /// In-region pixel count above which the reducer samples.
    pub max_pixels: u64,
    /// Component count above which vectors are omitted.
    pub max_vector_features: usize,
    /// Douglas-Peucker tolerance in map units.
    pub simplify_tolerance: f64,
    /// Produce vectors at all.
    pub vectorize: bool,
}

impl Default for AggregationOptions {
    fn default() -> Self {
        Self {
            max_pixels: DEFAULT_MAX_PIXELS,
            max_vector_features: DEFAULT_MAX_VECTOR_FEATURES,
            simplify_tolerance: DEFAULT_SIMPLIFY_TOLERANCE,
            vectorize: false,
        }
    }
}

impl AggregationOptions {
    pub fn validate(&self) -> Result<()> {
        if self.max_pixels == 0 {
            return Err(HydrosatError::InvalidConfig(
                "aggregation.max_pixels must be positive".to_string(),
            ));
        }
        if self.simplify_tolerance.is_nan() || self.simplify_tolerance < 0.0 {
            return Err(HydrosatError::InvalidConfig(format!(
                "aggregation.simplify_tolerance must be non-negative, got {}",
                self.simplify_tolerance
            )));
        }
        Ok(())
    }
}

/// Area and share of one class.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassStats {
    pub class_id: u8,
    pub hectares: f64,
    pub percent: f64,
    pub label: String,
    pub color: String,
}

/// Roll-up of the class areas.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaSummary {
    pub productive_ha: f64,
    pub vulnerable_ha: f64,
    pub water_ha: f64,
    pub waterlogged_ha: f64,
    pub bare_soil_ha: f64,
    /// Water plus waterlogged.
    pub problematic_ha: f64,
    pub problematic_pct: f64,
}

/// Aggregated statistics of a class map over a region.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AreaReport {
    pub area_total_ha: f64,
    pub classes: BTreeMap<ParcelClass, ClassStats>,
    pub summary: AreaSummary,
    /// Set when the pixel budget forced sampling.
    pub approximate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geojson: Option<FeatureCollection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_omitted: Option<VectorOmission>,
}

impl AreaReport {
    pub fn class(&self, class: ParcelClass) -> Option<&ClassStats> {
        self.classes.get(&class)
    }

    pub fn percent(&self, class: ParcelClass) -> f64 {
        self.class(class).map_or(0.0, |c| c.percent)
    }

    pub fn hectares(&self, class: ParcelClass) -> f64 {
        self.class(class).map_or(0.0, |c| c.hectares)
    }
}

/// Reduce a class map to per-class areas inside `region`, optionally with
/// simplified polygons.
pub fn aggregate(map: &ClassMap, region: &Region, options: &AggregationOptions) -> AreaReport {
    let inside = region.pixel_mask(&map.grid);
    let areas = class_areas(map, &inside, options.max_pixels);
    if areas.approximate {
        warn!(
            region = %region.name,
            stride = areas.stride,
            max_pixels = options.max_pixels,
            "Area reducer over pixel budget, result is approximate"
        );
    }

    let classes: BTreeMap<ParcelClass, ClassStats> = ParcelClass::ALL
        .into_iter()
        .map(|class| {
            let stats = ClassStats {
                class_id: class.id(),
                hectares: round2(areas.of(class)),
                percent: round2(areas.percent(class)),
                label: class.label().to_string(),
                color: class.color().to_string(),
            };
            (class, stats)
        })
        .collect();

    let problematic_ha = areas.of(ParcelClass::SurfaceWater) + areas.of(ParcelClass::Waterlogged);
    let problematic_pct = if areas.total_ha > 0.0 {
        problematic_ha / areas.total_ha * 100.0
    } else {
        0.0
    };
    let summary = AreaSummary {
        productive_ha: round2(areas.of(ParcelClass::HealthyCrop)),
        vulnerable_ha: round2(areas.of(ParcelClass::Stubble)),
        water_ha: round2(areas.of(ParcelClass::SurfaceWater)),
        waterlogged_ha: round2(areas.of(ParcelClass::Waterlogged)),
        bare_soil_ha: round2(areas.of(ParcelClass::BareSoil)),
        problematic_ha: round2(problematic_ha),
        problematic_pct: round2(problematic_pct),
    };

    let (geojson, vector_omitted) = if options.vectorize {
        match vectorize(map, options.max_vector_features, options.simplify_tolerance) {
            Vectorized::Features(fc) => (Some(fc), None),
            Vectorized::Omitted(omission) => (None, Some(omission)),
        }
    } else {
        (None, None)
    };

    info!(
        region = %region.name,
        total_ha = areas.total_ha,
        problematic_pct = summary.problematic_pct,
        approximate = areas.approximate,
        "Areas aggregated"
    );

    AreaReport {
        area_total_ha: round2(areas.total_ha),
        classes,
        summary,
        approximate: areas.approximate,
        geojson,
        vector_omitted,
    }
}

/// Round to two decimals for reporting.
pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
