#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use ndarray::Array2;

use hydrosat_core::imagery::{InMemoryProvider, Scene};
use hydrosat_core::monitor::{DashboardSummary, GeneralState, MonitorConfig, MonitoringService, SummaryPeriod};
use hydrosat_core::period::Period;
use hydrosat_core::raster::{Band, GridSpec, ProductLevel};
use hydrosat_core::region::{Region, RegionCatalog, Watershed};

/// Side of one test pixel in metres; one pixel is 0.01 ha.
pub const PIXEL_M: f64 = 10.0;

/// Ground covers with reflectances that land in exactly one class under the
/// default thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cover {
    Water,
    Waterlogged,
    Healthy,
    BareSoil,
    Stubble,
}

impl Cover {
    /// B2, B3, B4, B8, B11 digital numbers.
    pub fn reflectance(self) -> [f32; 5] {
        match self {
            Cover::Water => [800.0, 1000.0, 600.0, 300.0, 100.0],
            Cover::Waterlogged => [600.0, 1000.0, 900.0, 1200.0, 1000.0],
            Cover::Healthy => [300.0, 600.0, 300.0, 3000.0, 1800.0],
            Cover::BareSoil => [1000.0, 1200.0, 1800.0, 2000.0, 3000.0],
            Cover::Stubble => [800.0, 1000.0, 1400.0, 2200.0, 2600.0],
        }
    }
}

/// Scene class value for clear vegetation / bare pixels.
pub const SCL_CLEAR: f32 = 4.0;
/// Scene class value for high-probability cloud.
pub const SCL_CLOUD: f32 = 9.0;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 14, 0, 0).unwrap()
}

pub fn period(start: NaiveDate, end: NaiveDate) -> Period {
    Period::new(start, end).unwrap()
}

/// March 2024.
pub fn march_2024() -> Period {
    period(date(2024, 3, 1), date(2024, 4, 1))
}

/// February 2024.
pub fn february_2024() -> Period {
    period(date(2024, 2, 1), date(2024, 3, 1))
}

/// Square grid of 10 m pixels with its south-west corner at the origin.
pub fn grid(rows: usize, cols: usize) -> GridSpec {
    GridSpec::projected(0.0, rows as f64 * PIXEL_M, PIXEL_M, rows, cols)
}

/// Build a scene whose pixels follow `cover(row, col)` and whose scene
/// class band follows `scl(row, col)`.
pub fn scene_with(
    id: &str,
    acquired: DateTime<Utc>,
    cloud_pct: f32,
    product: ProductLevel,
    grid: &GridSpec,
    cover: impl Fn(usize, usize) -> Cover,
    scl: impl Fn(usize, usize) -> f32,
) -> Scene {
    let dim = grid.dim();
    let mut bands = BTreeMap::new();
    for (i, band) in Band::REFLECTANCE.into_iter().enumerate() {
        let data = Array2::from_shape_fn(dim, |(r, c)| cover(r, c).reflectance()[i]);
        bands.insert(band, data);
    }
    bands.insert(Band::SceneClass, Array2::from_shape_fn(dim, |(r, c)| scl(r, c)));
    Scene::new(id, acquired, cloud_pct, product, grid.clone(), bands).unwrap()
}

/// Cloud-free surface-reflectance scene.
pub fn scene(id: &str, acquired: DateTime<Utc>, cloud_pct: f32, grid: &GridSpec, cover: impl Fn(usize, usize) -> Cover) -> Scene {
    scene_with(
        id,
        acquired,
        cloud_pct,
        ProductLevel::SurfaceReflectance,
        grid,
        cover,
        |_, _| SCL_CLEAR,
    )
}

pub fn uniform_scene(id: &str, acquired: DateTime<Utc>, grid: &GridSpec, cover: Cover) -> Scene {
    scene(id, acquired, 5.0, grid, move |_, _| cover)
}

pub fn provider(scenes: Vec<Scene>) -> Arc<InMemoryProvider> {
    Arc::new(InMemoryProvider::new("sentinel-2", scenes))
}

/// Catalog over a `rows x cols` grid: the zone is the whole grid and each
/// watershed a quarter-width vertical strip, west to east in
/// `Watershed::ALL` order.
pub fn strip_catalog(rows: usize, cols: usize) -> RegionCatalog {
    let width = cols as f64 * PIXEL_M;
    let height = rows as f64 * PIXEL_M;
    let strip = width / 4.0;
    let zone = Region::from_rect("zona", (0.0, 0.0), (width, height));
    let watersheds = Watershed::ALL.into_iter().enumerate().map(|(i, w)| {
        let x0 = i as f64 * strip;
        (w, Region::from_rect(w.key(), (x0, 0.0), (x0 + strip, height)))
    });
    RegionCatalog::new(zone, watersheds)
}

/// Strip index of a column in a grid of `cols` columns.
pub fn strip_of(col: usize, cols: usize) -> usize {
    col * 4 / cols
}

pub fn service(scenes: Vec<Scene>, rows: usize, cols: usize) -> MonitoringService {
    MonitoringService::new(provider(scenes), strip_catalog(rows, cols), MonitorConfig::default()).unwrap()
}

/// Minimal dashboard payload for cache tests.
pub fn summary(problematic_pct: f64) -> DashboardSummary {
    DashboardSummary {
        general_state: GeneralState {
            area_total_ha: 100.0,
            productive_ha: 100.0 - problematic_pct,
            problematic_ha: problematic_pct,
            problematic_pct,
            images_processed: 1,
            approximate: false,
        },
        class_breakdown: BTreeMap::new(),
        top_alerts: Vec::new(),
        total_alert_count: 0,
        watershed_ranking: Vec::new(),
        skipped: Vec::new(),
        period: SummaryPeriod {
            start: date(2024, 3, 1),
            end: date(2024, 3, 31),
            days: 30,
        },
        generated_at: at(2024, 3, 31),
    }
}
