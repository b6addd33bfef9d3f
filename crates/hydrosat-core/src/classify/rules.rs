use super::{ClassificationThresholds, ParcelClass};
use crate::indices::PixelIndices;

/// One branch of the decision list.
pub struct Rule {
    pub class: ParcelClass,
    pub matches: fn(&PixelIndices, &ClassificationThresholds) -> bool,
}

/// Decision list, evaluated top to bottom; the first matching rule wins.
/// Later predicates only see pixels every earlier rule rejected, so none of
/// them has to repeat the earlier conditions.
pub static RULES: [Rule; 4] = [
    Rule {
        class: ParcelClass::SurfaceWater,
        matches: is_water,
    },
    Rule {
        class: ParcelClass::Waterlogged,
        matches: is_waterlogged,
    },
    Rule {
        class: ParcelClass::HealthyCrop,
        matches: is_healthy_crop,
    },
    Rule {
        class: ParcelClass::BareSoil,
        matches: is_bare_soil,
    },
];

/// Class assigned when no rule matches.
pub const FALLBACK: ParcelClass = ParcelClass::Stubble;

fn is_water(px: &PixelIndices, t: &ClassificationThresholds) -> bool {
    px.mndwi > t.water_mndwi || (px.ndwi > t.water_ndwi_high && px.ndvi < t.water_ndvi_max)
}

fn is_waterlogged(px: &PixelIndices, t: &ClassificationThresholds) -> bool {
    let stressed = px.ndvi < t.waterlogged_ndvi_max;
    let moderate_water = px.mndwi > t.waterlogged_mndwi_min && px.mndwi < t.water_mndwi;
    let saturated = px.ndmi > t.waterlogged_ndmi_min;
    stressed && (moderate_water || saturated)
}

fn is_healthy_crop(px: &PixelIndices, t: &ClassificationThresholds) -> bool {
    px.ndvi > t.healthy_ndvi_min && px.ndmi > t.healthy_ndmi_min && px.ndmi < t.healthy_ndmi_max
}

fn is_bare_soil(px: &PixelIndices, t: &ClassificationThresholds) -> bool {
    px.bsi > t.bare_soil_bsi_min
        && px.ndvi < t.bare_soil_ndvi_max
        && px.mndwi < t.bare_soil_mndwi_max
}
