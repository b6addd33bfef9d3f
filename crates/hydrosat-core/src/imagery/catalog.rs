//! JSON scene catalog.
//!
//! ```json
//! {
//!   "sensor": "sentinel-2",
//!   "scenes": [{
//!     "id": "S2A_20240305",
//!     "acquired": "2024-03-05T14:07:00Z",
//!     "cloud_pct": 12.5,
//!     "product": "surface_reflectance",
//!     "grid": { "origin_x": 0.0, "origin_y": 100.0, "pixel_width": 10.0,
//!               "pixel_height": 10.0, "rows": 10, "cols": 10 },
//!     "bands": { "B2": [...], "B3": [...], "B4": [...], "B8": [...],
//!                "B11": [...], "SCL": [...] }
//!   }]
//! }
//! ```
//!
//! Band arrays are row-major with `rows * cols` values.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::Deserialize;
use tracing::info;

use crate::error::{HydrosatError, Result};
use crate::raster::{Band, GridSpec, ProductLevel};

use super::{ImageryProvider, InMemoryProvider, Scene};

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default = "default_sensor")]
    sensor: String,
    scenes: Vec<SceneRecord>,
}

#[derive(Deserialize)]
struct SceneRecord {
    id: String,
    acquired: DateTime<Utc>,
    cloud_pct: f32,
    #[serde(default)]
    product: ProductLevel,
    grid: GridSpec,
    bands: BTreeMap<Band, Vec<f32>>,
}

fn default_sensor() -> String {
    "sentinel-2".to_string()
}

/// Parse a catalog document.
pub fn parse_catalog(json: &str) -> Result<InMemoryProvider> {
    let file: CatalogFile = serde_json::from_str(json)?;
    let scenes = file
        .scenes
        .into_iter()
        .map(into_scene)
        .collect::<Result<Vec<_>>>()?;
    Ok(InMemoryProvider::new(file.sensor, scenes))
}

/// Read and parse a catalog file.
pub fn load_catalog(path: &Path) -> Result<InMemoryProvider> {
    let json = std::fs::read_to_string(path)?;
    let provider = parse_catalog(&json)?;
    info!(
        path = %path.display(),
        scenes = provider.scenes().len(),
        sensor = provider.sensor(),
        "Loaded scene catalog"
    );
    Ok(provider)
}

fn into_scene(record: SceneRecord) -> Result<Scene> {
    let shape = record.grid.dim();
    let mut bands = BTreeMap::new();
    for (band, values) in record.bands {
        let found = values.len();
        let data = Array2::from_shape_vec(shape, values).map_err(|_| {
            HydrosatError::InvalidCatalog(format!(
                "scene {} band {}: expected {} values, found {}",
                record.id,
                band,
                shape.0 * shape.1,
                found
            ))
        })?;
        bands.insert(band, data);
    }
    Scene::new(
        record.id,
        record.acquired,
        record.cloud_pct,
        record.product,
        record.grid,
        bands,
    )
}
