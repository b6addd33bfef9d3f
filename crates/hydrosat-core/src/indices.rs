use ndarray::{Array2, ArrayView2, Zip};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::error::{HydrosatError, Result};
use crate::raster::{Band, GridSpec, RasterImage};

/// The five derived index rasters of a composite, co-registered with it.
#[derive(Clone, Debug)]
pub struct SpectralIndices {
    pub grid: GridSpec,
    /// Vegetation vigour, (NIR - Red) / (NIR + Red).
    pub ndvi: Array2<f32>,
    /// Green/NIR water index.
    pub ndwi: Array2<f32>,
    /// Green/SWIR water index, more tolerant of turbid and shallow water.
    pub mndwi: Array2<f32>,
    /// NIR/SWIR moisture index.
    pub ndmi: Array2<f32>,
    /// Bare-soil index.
    pub bsi: Array2<f32>,
}

/// Index values at one pixel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PixelIndices {
    pub ndvi: f32,
    pub ndwi: f32,
    pub mndwi: f32,
    pub ndmi: f32,
    pub bsi: f32,
}

impl SpectralIndices {
    /// All five indices at a pixel, or `None` when any of them is invalid.
    pub fn at(&self, row: usize, col: usize) -> Option<PixelIndices> {
        let px = PixelIndices {
            ndvi: *self.ndvi.get((row, col))?,
            ndwi: *self.ndwi.get((row, col))?,
            mndwi: *self.mndwi.get((row, col))?,
            ndmi: *self.ndmi.get((row, col))?,
            bsi: *self.bsi.get((row, col))?,
        };
        px.is_valid().then_some(px)
    }

    pub fn dim(&self) -> (usize, usize) {
        self.ndvi.dim()
    }
}

impl PixelIndices {
    pub fn is_valid(&self) -> bool {
        self.ndvi.is_finite()
            && self.ndwi.is_finite()
            && self.mndwi.is_finite()
            && self.ndmi.is_finite()
            && self.bsi.is_finite()
    }
}

/// `(a - b) / (a + b)` clamped to [-1, 1]; NaN for invalid input or a
/// non-positive denominator.
pub fn normalized_difference(a: f32, b: f32) -> f32 {
    ratio(a - b, a + b)
}

/// `((swir + red) - (nir + blue)) / ((swir + red) + (nir + blue))`.
pub fn bare_soil_index(blue: f32, red: f32, nir: f32, swir: f32) -> f32 {
    normalized_difference(swir + red, nir + blue)
}

fn ratio(num: f32, den: f32) -> f32 {
    if !num.is_finite() || !den.is_finite() || den <= f32::EPSILON {
        return f32::NAN;
    }
    (num / den).clamp(-1.0, 1.0)
}

/// Compute every index from a composite. Pure; identical bands give
/// identical output.
pub fn compute_indices(image: &RasterImage) -> Result<SpectralIndices> {
    let blue = image.band(Band::Blue)?;
    let green = image.band(Band::Green)?;
    let red = image.band(Band::Red)?;
    let nir = image.band(Band::Nir)?;
    let swir = image.band(Band::Swir1)?;

    let indices = SpectralIndices {
        grid: image.grid().clone(),
        ndvi: pairwise(nir.view(), red.view(), normalized_difference)?,
        ndwi: pairwise(green.view(), nir.view(), normalized_difference)?,
        mndwi: pairwise(green.view(), swir.view(), normalized_difference)?,
        ndmi: pairwise(nir.view(), swir.view(), normalized_difference)?,
        bsi: bare_soil(blue.view(), red.view(), nir.view(), swir.view()),
    };

    let invalid = indices.ndvi.iter().filter(|v| !v.is_finite()).count();
    debug!(grid = %indices.grid, invalid_pixels = invalid, "Spectral indices computed");
    Ok(indices)
}

fn pairwise(
    a: ArrayView2<f32>,
    b: ArrayView2<f32>,
    f: fn(f32, f32) -> f32,
) -> Result<Array2<f32>> {
    if a.dim() != b.dim() {
        return Err(HydrosatError::ShapeMismatch {
            expected: a.dim(),
            found: b.dim(),
        });
    }
    let zip = Zip::from(&a).and(&b);
    Ok(if a.len() >= PARALLEL_PIXEL_THRESHOLD {
        zip.par_map_collect(|&x, &y| f(x, y))
    } else {
        zip.map_collect(|&x, &y| f(x, y))
    })
}

fn bare_soil(
    blue: ArrayView2<f32>,
    red: ArrayView2<f32>,
    nir: ArrayView2<f32>,
    swir: ArrayView2<f32>,
) -> Array2<f32> {
    let zip = Zip::from(&blue).and(&red).and(&nir).and(&swir);
    if blue.len() >= PARALLEL_PIXEL_THRESHOLD {
        zip.par_map_collect(|&b, &r, &n, &s| bare_soil_index(b, r, n, s))
    } else {
        zip.map_collect(|&b, &r, &n, &s| bare_soil_index(b, r, n, s))
    }
}
