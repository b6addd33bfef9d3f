pub mod catalog;
mod timed;

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{HydrosatError, Result};
use crate::period::Period;
use crate::raster::{Band, GridSpec, ProductLevel};
use crate::region::Region;

pub use catalog::{load_catalog, parse_catalog};
pub use timed::TimedProvider;

/// Parameters of one scene search, echoed back in `NoImagery` errors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageryQuery {
    pub region: String,
    pub period: Period,
    pub max_cloud_pct: f32,
    pub product: ProductLevel,
}

impl fmt::Display for ImageryQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "region '{}', {}, cloud < {}% ({})",
            self.region, self.period, self.max_cloud_pct, self.product
        )
    }
}

/// One acquisition as delivered by an imagery provider.
#[derive(Clone, Debug)]
pub struct Scene {
    pub id: String,
    pub acquired: DateTime<Utc>,
    pub cloud_pct: f32,
    pub product: ProductLevel,
    pub grid: GridSpec,
    pub bands: BTreeMap<Band, Array2<f32>>,
}

impl Scene {
    pub fn new(
        id: impl Into<String>,
        acquired: DateTime<Utc>,
        cloud_pct: f32,
        product: ProductLevel,
        grid: GridSpec,
        bands: BTreeMap<Band, Array2<f32>>,
    ) -> Result<Self> {
        for data in bands.values() {
            grid.check_shape(data)?;
        }
        Ok(Self {
            id: id.into(),
            acquired,
            cloud_pct,
            product,
            grid,
            bands,
        })
    }

    pub fn band(&self, band: Band) -> Result<&Array2<f32>> {
        self.bands.get(&band).ok_or_else(|| HydrosatError::MissingBand {
            scene: self.id.clone(),
            band,
        })
    }

    /// True when the scene satisfies the query's window, cloud limit and
    /// product level and overlaps the region.
    pub fn matches(&self, region: &Region, query: &ImageryQuery) -> bool {
        self.product == query.product
            && query.period.contains(self.acquired.date_naive())
            && self.cloud_pct < query.max_cloud_pct
            && region.intersects_grid(&self.grid)
    }
}

/// Source of scenes for a region and date window.
///
/// Implementations may block on a remote service; callers that must stay
/// responsive wrap them in a [`TimedProvider`].
pub trait ImageryProvider: Send + Sync {
    /// Scenes intersecting `region` inside the query window and below the
    /// cloud limit, in catalog order.
    fn fetch_scenes(&self, region: &Region, query: &ImageryQuery) -> Result<Vec<Scene>>;

    /// Sensor identity stamped on composites.
    fn sensor(&self) -> &str {
        "sentinel-2"
    }
}

/// Provider backed by scenes held in memory, in catalog order.
#[derive(Clone, Debug, Default)]
pub struct InMemoryProvider {
    sensor: String,
    scenes: Vec<Scene>,
}

impl InMemoryProvider {
    pub fn new(sensor: impl Into<String>, scenes: Vec<Scene>) -> Self {
        Self {
            sensor: sensor.into(),
            scenes,
        }
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }
}

impl ImageryProvider for InMemoryProvider {
    fn fetch_scenes(&self, region: &Region, query: &ImageryQuery) -> Result<Vec<Scene>> {
        Ok(self
            .scenes
            .iter()
            .filter(|scene| scene.matches(region, query))
            .cloned()
            .collect())
    }

    fn sensor(&self) -> &str {
        &self.sensor
    }
}
