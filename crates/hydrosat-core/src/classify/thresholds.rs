use serde::{Deserialize, Serialize};

use crate::error::{HydrosatError, Result};

/// Index cutoffs used by the parcel classifier. Passed by reference into
/// each run and never modified during it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationThresholds {
    /// MNDWI above this is open water.
    pub water_mndwi: f32,
    /// NDWI above this is water when vegetation is absent.
    pub water_ndwi_high: f32,
    /// Vegetation ceiling for the NDWI water branch.
    pub water_ndvi_max: f32,

    /// Lower MNDWI bound of the waterlogged band (upper bound is `water_mndwi`).
    pub waterlogged_mndwi_min: f32,
    /// NDMI above this marks saturated soil.
    pub waterlogged_ndmi_min: f32,
    /// Vegetation ceiling for stressed, waterlogged fields.
    pub waterlogged_ndvi_max: f32,

    /// NDVI floor for a healthy crop.
    pub healthy_ndvi_min: f32,
    /// Normal moisture band for a healthy crop.
    pub healthy_ndmi_min: f32,
    pub healthy_ndmi_max: f32,

    /// BSI floor for bare soil.
    pub bare_soil_bsi_min: f32,
    /// Vegetation ceiling for bare soil.
    pub bare_soil_ndvi_max: f32,
    /// MNDWI ceiling confirming no water signal on bare soil.
    pub bare_soil_mndwi_max: f32,
}

impl Default for ClassificationThresholds {
    fn default() -> Self {
        Self {
            water_mndwi: 0.15,
            water_ndwi_high: 0.35,
            water_ndvi_max: 0.10,
            waterlogged_mndwi_min: -0.10,
            waterlogged_ndmi_min: 0.25,
            waterlogged_ndvi_max: 0.30,
            healthy_ndvi_min: 0.40,
            healthy_ndmi_min: -0.10,
            healthy_ndmi_max: 0.40,
            bare_soil_bsi_min: 0.05,
            bare_soil_ndvi_max: 0.15,
            bare_soil_mndwi_max: -0.20,
        }
    }
}

impl ClassificationThresholds {
    /// Reject cutoffs that would leave a branch empty or out of index range.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("water_mndwi", self.water_mndwi),
            ("water_ndwi_high", self.water_ndwi_high),
            ("water_ndvi_max", self.water_ndvi_max),
            ("waterlogged_mndwi_min", self.waterlogged_mndwi_min),
            ("waterlogged_ndmi_min", self.waterlogged_ndmi_min),
            ("waterlogged_ndvi_max", self.waterlogged_ndvi_max),
            ("healthy_ndvi_min", self.healthy_ndvi_min),
            ("healthy_ndmi_min", self.healthy_ndmi_min),
            ("healthy_ndmi_max", self.healthy_ndmi_max),
            ("bare_soil_bsi_min", self.bare_soil_bsi_min),
            ("bare_soil_ndvi_max", self.bare_soil_ndvi_max),
            ("bare_soil_mndwi_max", self.bare_soil_mndwi_max),
        ];
        for (name, value) in fields {
            if !(-1.0..=1.0).contains(&value) {
                return Err(HydrosatError::InvalidConfig(format!(
                    "threshold {name} = {value} is outside [-1, 1]"
                )));
            }
        }
        if self.waterlogged_mndwi_min >= self.water_mndwi {
            return Err(HydrosatError::InvalidConfig(format!(
                "waterlogged_mndwi_min ({}) must be below water_mndwi ({})",
                self.waterlogged_mndwi_min, self.water_mndwi
            )));
        }
        if self.healthy_ndmi_min >= self.healthy_ndmi_max {
            return Err(HydrosatError::InvalidConfig(format!(
                "healthy_ndmi_min ({}) must be below healthy_ndmi_max ({})",
                self.healthy_ndmi_min, self.healthy_ndmi_max
            )));
        }
        Ok(())
    }
}
