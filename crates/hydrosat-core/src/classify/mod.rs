//! Ordered, mutually exclusive parcel classification.

pub mod rules;
pub mod thresholds;

use std::fmt;

use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::indices::{PixelIndices, SpectralIndices};
use crate::raster::GridSpec;

pub use rules::{Rule, FALLBACK, RULES};
pub use thresholds::ClassificationThresholds;

/// Land-cover class of a valid pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParcelClass {
    HealthyCrop,
    Stubble,
    SurfaceWater,
    Waterlogged,
    BareSoil,
}

impl ParcelClass {
    /// Every class, in id order.
    pub const ALL: [ParcelClass; 5] = [
        ParcelClass::HealthyCrop,
        ParcelClass::Stubble,
        ParcelClass::SurfaceWater,
        ParcelClass::Waterlogged,
        ParcelClass::BareSoil,
    ];

    /// Stable numeric id.
    pub fn id(self) -> u8 {
        match self {
            Self::HealthyCrop => 0,
            Self::Stubble => 1,
            Self::SurfaceWater => 2,
            Self::Waterlogged => 3,
            Self::BareSoil => 4,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::HealthyCrop => "healthy_crop",
            Self::Stubble => "stubble",
            Self::SurfaceWater => "surface_water",
            Self::Waterlogged => "waterlogged",
            Self::BareSoil => "bare_soil",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::HealthyCrop => "Healthy crop",
            Self::Stubble => "Stubble / residue",
            Self::SurfaceWater => "Surface water",
            Self::Waterlogged => "Waterlogged field",
            Self::BareSoil => "Bare soil",
        }
    }

    /// Display colour, `#RRGGBB`.
    pub fn color(self) -> &'static str {
        match self {
            Self::HealthyCrop => "#2ECC71",
            Self::Stubble => "#F39C12",
            Self::SurfaceWater => "#3498DB",
            Self::Waterlogged => "#E74C3C",
            Self::BareSoil => "#95A5A6",
        }
    }

    /// Water and waterlogged pixels count as problematic.
    pub fn is_problematic(self) -> bool {
        matches!(self, Self::SurfaceWater | Self::Waterlogged)
    }
}

impl fmt::Display for ParcelClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-pixel classes over a grid; `None` marks masked pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassMap {
    pub grid: GridSpec,
    pub classes: Array2<Option<ParcelClass>>,
}

impl ClassMap {
    pub fn get(&self, row: usize, col: usize) -> Option<ParcelClass> {
        self.classes.get((row, col)).copied().flatten()
    }

    /// Pixel count per class, indexed by class id.
    pub fn pixel_counts(&self) -> [usize; 5] {
        let mut counts = [0usize; 5];
        for class in self.classes.iter().flatten() {
            counts[class.id() as usize] += 1;
        }
        counts
    }
}

/// Walk the decision list for one pixel.
pub fn classify_pixel(px: &PixelIndices, thresholds: &ClassificationThresholds) -> ParcelClass {
    RULES
        .iter()
        .find(|rule| (rule.matches)(px, thresholds))
        .map_or(FALLBACK, |rule| rule.class)
}

/// Classify every valid pixel. Pixels with any invalid index stay `None`.
pub fn classify(indices: &SpectralIndices, thresholds: &ClassificationThresholds) -> ClassMap {
    let classify_one = |&ndvi: &f32, &ndwi: &f32, &mndwi: &f32, &ndmi: &f32, &bsi: &f32| {
        let px = PixelIndices {
            ndvi,
            ndwi,
            mndwi,
            ndmi,
            bsi,
        };
        px.is_valid().then(|| classify_pixel(&px, thresholds))
    };

    let zip = Zip::from(&indices.ndvi)
        .and(&indices.ndwi)
        .and(&indices.mndwi)
        .and(&indices.ndmi)
        .and(&indices.bsi);
    let classes = if indices.ndvi.len() >= PARALLEL_PIXEL_THRESHOLD {
        zip.par_map_collect(classify_one)
    } else {
        zip.map_collect(classify_one)
    };

    let map = ClassMap {
        grid: indices.grid.clone(),
        classes,
    };
    let counts = map.pixel_counts();
    debug!(
        healthy = counts[0],
        stubble = counts[1],
        water = counts[2],
        waterlogged = counts[3],
        bare_soil = counts[4],
        "Pixels classified"
    );
    map
}
