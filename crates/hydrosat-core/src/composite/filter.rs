use std::collections::BTreeMap;

use ndarray::{Array2, Zip};
use tracing::{debug, info};

use crate::consts::MASKED_SCENE_CLASSES;
use crate::error::{HydrosatError, Result};
use crate::imagery::{ImageryProvider, ImageryQuery, Scene};
use crate::raster::Band;
use crate::region::Region;

/// Fetch the scenes satisfying `query` and re-check every constraint
/// locally, so providers that over-return cannot leak scenes through.
///
/// Returns `NoImagery` when nothing survives.
pub fn select_scenes(
    provider: &dyn ImageryProvider,
    region: &Region,
    query: &ImageryQuery,
) -> Result<Vec<Scene>> {
    let candidates = provider.fetch_scenes(region, query)?;
    let offered = candidates.len();
    let selected: Vec<Scene> = candidates
        .into_iter()
        .filter(|scene| scene.matches(region, query))
        .collect();

    info!(
        region = %query.region,
        offered,
        selected = selected.len(),
        max_cloud = query.max_cloud_pct,
        "Scene selection"
    );

    if selected.is_empty() {
        return Err(HydrosatError::NoImagery {
            query: query.clone(),
        });
    }
    Ok(selected)
}

/// Reflectance bands of a scene with cloud, shadow and cirrus pixels set
/// to NaN according to its SCL band.
pub fn mask_clouds(scene: &Scene) -> Result<BTreeMap<Band, Array2<f32>>> {
    let scl = scene.band(Band::SceneClass)?;
    let masked_pixels = scl.iter().filter(|&&c| is_masked_class(c)).count();
    debug!(scene = %scene.id, masked_pixels, "Cloud mask");

    let mut bands = BTreeMap::new();
    for band in Band::REFLECTANCE {
        let mut data = scene.band(band)?.clone();
        Zip::from(&mut data).and(scl).for_each(|value, &class| {
            if is_masked_class(class) {
                *value = f32::NAN;
            }
        });
        bands.insert(band, data);
    }
    Ok(bands)
}

/// Reflectance bands of a scene, unmasked.
pub fn unmasked_bands(scene: &Scene) -> Result<BTreeMap<Band, Array2<f32>>> {
    Band::REFLECTANCE
        .into_iter()
        .map(|band| Ok((band, scene.band(band)?.clone())))
        .collect()
}

fn is_masked_class(class: f32) -> bool {
    class.is_finite() && MASKED_SCENE_CLASSES.iter().any(|&c| c as f32 == class)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masked_classes() {
        for c in [3.0, 8.0, 9.0, 10.0] {
            assert!(is_masked_class(c));
        }
        for c in [0.0, 4.0, 5.0, 6.0, 11.0, f32::NAN] {
            assert!(!is_masked_class(c));
        }
    }
}
