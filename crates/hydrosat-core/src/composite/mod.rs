//! Scene selection, cloud masking and compositing into one image per period.

pub mod filter;
pub mod median;
pub mod mosaic;

use std::collections::BTreeMap;
use std::fmt;

use chrono::Datelike;
use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::consts::SURFACE_REFLECTANCE_FIRST_YEAR;
use crate::error::{HydrosatError, Result};
use crate::imagery::{ImageryProvider, ImageryQuery, Scene};
use crate::period::Period;
use crate::raster::{Band, GridSpec, ProductLevel, RasterImage};
use crate::region::Region;

pub use filter::{mask_clouds, select_scenes};
pub use median::median_composite;
pub use mosaic::mosaic_composite;

/// How a masked scene stack is merged into one image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeMethod {
    /// First unmasked pixel in catalog order.
    Mosaic,
    /// Per-pixel median of the unmasked stack.
    #[default]
    Median,
}

impl fmt::Display for CompositeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mosaic => write!(f, "Mosaic"),
            Self::Median => write!(f, "Median"),
        }
    }
}

/// A composite image and the scenes it was built from.
#[derive(Clone, Debug)]
pub struct Composite {
    pub image: RasterImage,
    pub scene_count: usize,
    pub method: CompositeMethod,
}

/// Request for one composite.
#[derive(Clone, Debug)]
pub struct CompositeRequest<'a> {
    pub region: &'a Region,
    pub period: Period,
    pub max_cloud_pct: f32,
    pub method: CompositeMethod,
}

/// Windows starting before surface-reflectance coverage use the
/// top-of-atmosphere product.
pub fn uses_top_of_atmosphere(period: &Period) -> bool {
    period.start.year() < SURFACE_REFLECTANCE_FIRST_YEAR
}

/// Select, mask and merge the scenes for a region and period.
pub fn build_composite(provider: &dyn ImageryProvider, request: &CompositeRequest) -> Result<Composite> {
    if uses_top_of_atmosphere(&request.period) {
        return build_toa_composite(provider, request);
    }

    let query = ImageryQuery {
        region: request.region.name.clone(),
        period: request.period,
        max_cloud_pct: request.max_cloud_pct,
        product: ProductLevel::SurfaceReflectance,
    };
    let scenes = select_scenes(provider, request.region, &query)?;
    let grid = common_grid(&scenes, &query)?;

    let masked = scenes
        .iter()
        .map(mask_clouds)
        .collect::<Result<Vec<_>>>()?;
    let bands = merge_bands(&masked, request.method);

    finish(provider, request, &scenes, grid, bands, request.method, ProductLevel::SurfaceReflectance)
}

/// Top-of-atmosphere path: scenes carry no reliable cloud band, so they are
/// mosaicked unmasked.
fn build_toa_composite(provider: &dyn ImageryProvider, request: &CompositeRequest) -> Result<Composite> {
    let query = ImageryQuery {
        region: request.region.name.clone(),
        period: request.period,
        max_cloud_pct: request.max_cloud_pct,
        product: ProductLevel::TopOfAtmosphere,
    };
    let scenes = select_scenes(provider, request.region, &query)?;
    let grid = common_grid(&scenes, &query)?;

    let unmasked = scenes
        .iter()
        .map(filter::unmasked_bands)
        .collect::<Result<Vec<_>>>()?;
    let bands = merge_bands(&unmasked, CompositeMethod::Mosaic);

    finish(provider, request, &scenes, grid, bands, CompositeMethod::Mosaic, ProductLevel::TopOfAtmosphere)
}

fn finish(
    provider: &dyn ImageryProvider,
    request: &CompositeRequest,
    scenes: &[Scene],
    grid: GridSpec,
    mut bands: BTreeMap<Band, Array2<f32>>,
    method: CompositeMethod,
    product: ProductLevel,
) -> Result<Composite> {
    let inside = request.region.pixel_mask(&grid);
    for data in bands.values_mut() {
        clip_to_mask(data, &inside);
    }

    let dates = scenes.iter().map(|s| s.acquired.date_naive()).collect();
    let image = RasterImage::new(grid, bands, dates, provider.sensor(), product)?;

    info!(
        region = %request.region.name,
        scenes = scenes.len(),
        method = %method,
        product = %product,
        dates = image.acquisition_dates().len(),
        "Composite built"
    );

    Ok(Composite {
        image,
        scene_count: scenes.len(),
        method,
    })
}

fn common_grid(scenes: &[Scene], query: &ImageryQuery) -> Result<GridSpec> {
    let Some(first) = scenes.first() else {
        return Err(HydrosatError::NoImagery {
            query: query.clone(),
        });
    };
    for scene in &scenes[1..] {
        if scene.grid != first.grid {
            return Err(HydrosatError::GridMismatch {
                scene: scene.id.clone(),
                expected: first.grid.to_string(),
                found: scene.grid.to_string(),
            });
        }
    }
    Ok(first.grid.clone())
}

fn merge_bands(
    stack: &[BTreeMap<Band, Array2<f32>>],
    method: CompositeMethod,
) -> BTreeMap<Band, Array2<f32>> {
    Band::REFLECTANCE
        .into_iter()
        .map(|band| {
            let layers: Vec<&Array2<f32>> = stack.iter().filter_map(|s| s.get(&band)).collect();
            let merged = match method {
                CompositeMethod::Mosaic => mosaic_composite(&layers),
                CompositeMethod::Median => median_composite(&layers),
            };
            (band, merged)
        })
        .collect()
}

fn clip_to_mask(data: &mut Array2<f32>, inside: &Array2<bool>) {
    Zip::from(data).and(inside).for_each(|value, &keep| {
        if !keep {
            *value = f32::NAN;
        }
    });
}
