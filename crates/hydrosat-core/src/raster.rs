use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use geo::{coord, Rect};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::consts::{METRES_PER_DEGREE_LAT, METRES_PER_DEGREE_LON};
use crate::error::{HydrosatError, Result};

/// Spectral bands consumed by the engine, named after the optical sensor's
/// band identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Band {
    #[serde(rename = "B2")]
    Blue,
    #[serde(rename = "B3")]
    Green,
    #[serde(rename = "B4")]
    Red,
    #[serde(rename = "B8")]
    Nir,
    #[serde(rename = "B11")]
    Swir1,
    /// Per-pixel scene classification used for cloud/shadow masking.
    #[serde(rename = "SCL")]
    SceneClass,
}

impl Band {
    /// Reflectance bands, in the order they are composited.
    pub const REFLECTANCE: [Band; 5] = [Band::Blue, Band::Green, Band::Red, Band::Nir, Band::Swir1];

    pub fn sensor_name(self) -> &'static str {
        match self {
            Self::Blue => "B2",
            Self::Green => "B3",
            Self::Red => "B4",
            Self::Nir => "B8",
            Self::Swir1 => "B11",
            Self::SceneClass => "SCL",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sensor_name())
    }
}

/// Processing level of a scene product.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductLevel {
    /// Atmospherically corrected reflectance with a usable SCL band.
    #[default]
    SurfaceReflectance,
    /// Top-of-atmosphere reflectance; no reliable cloud band.
    TopOfAtmosphere,
}

impl fmt::Display for ProductLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SurfaceReflectance => write!(f, "surface reflectance"),
            Self::TopOfAtmosphere => write!(f, "top of atmosphere"),
        }
    }
}

/// Coordinate system of a grid's map coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateSystem {
    /// Planar coordinates in metres.
    #[default]
    Projected,
    /// Longitude/latitude in degrees.
    Geographic,
}

/// North-up pixel grid: origin is the north-west corner, rows grow southward.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
    pub rows: usize,
    pub cols: usize,
    #[serde(default)]
    pub crs: CoordinateSystem,
}

impl GridSpec {
    pub fn projected(origin_x: f64, origin_y: f64, pixel_size: f64, rows: usize, cols: usize) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width: pixel_size,
            pixel_height: pixel_size,
            rows,
            cols,
            crs: CoordinateSystem::Projected,
        }
    }

    pub fn dim(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn pixel_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Map coordinates of a pixel centre.
    pub fn pixel_center(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y - (row as f64 + 0.5) * self.pixel_height,
        )
    }

    /// Map coordinates of a pixel corner; `row` and `col` may equal the
    /// grid dimensions to address the far edges.
    pub fn corner(&self, row: usize, col: usize) -> (f64, f64) {
        (
            self.origin_x + col as f64 * self.pixel_width,
            self.origin_y - row as f64 * self.pixel_height,
        )
    }

    /// Ground area of one pixel in the given row, in square metres.
    pub fn pixel_area_m2(&self, row: usize) -> f64 {
        match self.crs {
            CoordinateSystem::Projected => self.pixel_width * self.pixel_height,
            CoordinateSystem::Geographic => {
                let (_, lat) = self.pixel_center(row, 0);
                let width_m = self.pixel_width * METRES_PER_DEGREE_LON * lat.to_radians().cos();
                let height_m = self.pixel_height * METRES_PER_DEGREE_LAT;
                width_m.abs() * height_m
            }
        }
    }

    pub fn bounds(&self) -> Rect<f64> {
        let (min_x, max_y) = self.corner(0, 0);
        let (max_x, min_y) = self.corner(self.rows, self.cols);
        Rect::new(coord! { x: min_x, y: min_y }, coord! { x: max_x, y: max_y })
    }

    pub(crate) fn check_shape(&self, data: &Array2<f32>) -> Result<()> {
        if data.dim() != self.dim() {
            return Err(HydrosatError::ShapeMismatch {
                expected: self.dim(),
                found: data.dim(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for GridSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} @ ({}, {}) step {}x{}",
            self.cols, self.rows, self.origin_x, self.origin_y, self.pixel_width, self.pixel_height
        )
    }
}

/// Composite multispectral image over a region.
/// Band values are reflectance digital numbers; masked pixels are NaN.
#[derive(Clone, Debug)]
pub struct RasterImage {
    grid: GridSpec,
    bands: BTreeMap<Band, Array2<f32>>,
    acquisition_dates: Vec<NaiveDate>,
    sensor: String,
    product: ProductLevel,
}

impl RasterImage {
    pub fn new(
        grid: GridSpec,
        bands: BTreeMap<Band, Array2<f32>>,
        mut acquisition_dates: Vec<NaiveDate>,
        sensor: impl Into<String>,
        product: ProductLevel,
    ) -> Result<Self> {
        for data in bands.values() {
            grid.check_shape(data)?;
        }
        acquisition_dates.sort_unstable();
        acquisition_dates.dedup();
        Ok(Self {
            grid,
            bands,
            acquisition_dates,
            sensor: sensor.into(),
            product,
        })
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    pub fn band(&self, band: Band) -> Result<&Array2<f32>> {
        self.bands.get(&band).ok_or_else(|| HydrosatError::MissingBand {
            scene: "composite".to_string(),
            band,
        })
    }

    /// Distinct acquisition dates, ascending.
    pub fn acquisition_dates(&self) -> &[NaiveDate] {
        &self.acquisition_dates
    }

    pub fn sensor(&self) -> &str {
        &self.sensor
    }

    pub fn product(&self) -> ProductLevel {
        self.product
    }
}
