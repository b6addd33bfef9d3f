mod common;

use hydrosat_core::composite::{build_composite, uses_top_of_atmosphere, CompositeMethod, CompositeRequest};
use hydrosat_core::error::HydrosatError;
use hydrosat_core::imagery::InMemoryProvider;
use hydrosat_core::raster::{Band, GridSpec, ProductLevel};
use hydrosat_core::region::Region;

use common::{
    at, date, grid, march_2024, period, provider, scene, scene_with, uniform_scene, Cover, SCL_CLEAR,
    SCL_CLOUD,
};

fn whole(rows: usize, cols: usize) -> Region {
    Region::from_rect("test", (0.0, 0.0), (cols as f64 * 10.0, rows as f64 * 10.0))
}

fn request(region: &Region, method: CompositeMethod) -> CompositeRequest<'_> {
    CompositeRequest {
        region,
        period: march_2024(),
        max_cloud_pct: 30.0,
        method,
    }
}

// ---------------------------------------------------------------------------
// Scene selection
// ---------------------------------------------------------------------------

#[test]
fn test_cloud_limit_is_strict() {
    let g = grid(2, 2);
    let p = provider(vec![
        scene("at_limit", at(2024, 3, 5), 30.0, &g, |_, _| Cover::Water),
        scene("below", at(2024, 3, 9), 29.9, &g, |_, _| Cover::Healthy),
    ]);
    let region = whole(2, 2);
    let composite = build_composite(p.as_ref(), &request(&region, CompositeMethod::Mosaic)).unwrap();
    assert_eq!(composite.scene_count, 1);
    assert_eq!(composite.image.acquisition_dates(), &[date(2024, 3, 9)]);
}

#[test]
fn test_window_end_is_exclusive() {
    let g = grid(2, 2);
    let p = provider(vec![uniform_scene("april", at(2024, 4, 1), &g, Cover::Water)]);
    let region = whole(2, 2);
    let err = build_composite(p.as_ref(), &request(&region, CompositeMethod::Median)).unwrap_err();
    assert_eq!(err.code(), "NO_IMAGERY");
}

#[test]
fn test_no_imagery_echoes_query() {
    let g = grid(2, 2);
    let p = provider(vec![scene("cloudy", at(2024, 3, 5), 80.0, &g, |_, _| Cover::Water)]);
    let region = whole(2, 2);
    let err = build_composite(p.as_ref(), &request(&region, CompositeMethod::Median)).unwrap_err();
    match &err {
        HydrosatError::NoImagery { query } => {
            assert_eq!(query.region, "test");
            assert_eq!(query.period, march_2024());
            assert_eq!(query.max_cloud_pct, 30.0);
            assert_eq!(query.product, ProductLevel::SurfaceReflectance);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_recoverable());
    assert!(err.to_string().contains("2024-03-01"));
}

#[test]
fn test_scene_outside_region_is_ignored() {
    let g = grid(2, 2);
    let p = provider(vec![uniform_scene("s1", at(2024, 3, 5), &g, Cover::Water)]);
    let far = Region::from_rect("far", (1_000.0, 1_000.0), (2_000.0, 2_000.0));
    let err = build_composite(p.as_ref(), &request(&far, CompositeMethod::Median)).unwrap_err();
    assert_eq!(err.code(), "NO_IMAGERY");
}

// ---------------------------------------------------------------------------
// Compositing
// ---------------------------------------------------------------------------

#[test]
fn test_mosaic_takes_first_scene_in_catalog_order() {
    let g = grid(2, 2);
    let p = provider(vec![
        uniform_scene("later", at(2024, 3, 20), &g, Cover::Water),
        uniform_scene("earlier", at(2024, 3, 2), &g, Cover::Healthy),
    ]);
    let region = whole(2, 2);
    let composite = build_composite(p.as_ref(), &request(&region, CompositeMethod::Mosaic)).unwrap();
    let nir = composite.image.band(Band::Nir).unwrap();
    assert_eq!(nir[[0, 0]], Cover::Water.reflectance()[3]);
    assert_eq!(composite.method, CompositeMethod::Mosaic);
}

#[test]
fn test_mosaic_fills_masked_pixels_from_later_scenes() {
    let g = grid(1, 2);
    let cloudy = scene_with(
        "cloudy",
        at(2024, 3, 5),
        10.0,
        ProductLevel::SurfaceReflectance,
        &g,
        |_, _| Cover::Water,
        |_, c| if c == 0 { SCL_CLOUD } else { SCL_CLEAR },
    );
    let clear = uniform_scene("clear", at(2024, 3, 9), &g, Cover::Healthy);
    let p = provider(vec![cloudy, clear]);
    let region = whole(1, 2);
    let composite = build_composite(p.as_ref(), &request(&region, CompositeMethod::Mosaic)).unwrap();
    let nir = composite.image.band(Band::Nir).unwrap();
    assert_eq!(nir[[0, 0]], Cover::Healthy.reflectance()[3]);
    assert_eq!(nir[[0, 1]], Cover::Water.reflectance()[3]);
}

#[test]
fn test_median_of_three_scenes() {
    let g = grid(1, 1);
    let p = provider(vec![
        uniform_scene("a", at(2024, 3, 2), &g, Cover::Water),
        uniform_scene("b", at(2024, 3, 12), &g, Cover::Healthy),
        uniform_scene("c", at(2024, 3, 22), &g, Cover::BareSoil),
    ]);
    let region = whole(1, 1);
    let composite = build_composite(p.as_ref(), &request(&region, CompositeMethod::Median)).unwrap();
    let nir = composite.image.band(Band::Nir).unwrap();
    // NIR values 300, 3000, 2000
    assert_eq!(nir[[0, 0]], 2000.0);
    assert_eq!(composite.scene_count, 3);
}

#[test]
fn test_median_skips_clouded_samples() {
    let g = grid(1, 1);
    let clouded = scene_with(
        "clouded",
        at(2024, 3, 2),
        20.0,
        ProductLevel::SurfaceReflectance,
        &g,
        |_, _| Cover::Water,
        |_, _| SCL_CLOUD,
    );
    let p = provider(vec![
        clouded,
        uniform_scene("b", at(2024, 3, 12), &g, Cover::Healthy),
        uniform_scene("c", at(2024, 3, 22), &g, Cover::BareSoil),
    ]);
    let region = whole(1, 1);
    let composite = build_composite(p.as_ref(), &request(&region, CompositeMethod::Median)).unwrap();
    let nir = composite.image.band(Band::Nir).unwrap();
    assert_eq!(nir[[0, 0]], 2500.0);
}

#[test]
fn test_fully_masked_pixel_is_nan() {
    let g = grid(1, 2);
    let s = scene_with(
        "s",
        at(2024, 3, 5),
        10.0,
        ProductLevel::SurfaceReflectance,
        &g,
        |_, _| Cover::Healthy,
        |_, c| if c == 1 { 3.0 } else { SCL_CLEAR },
    );
    let p = provider(vec![s]);
    let region = whole(1, 2);
    let composite = build_composite(p.as_ref(), &request(&region, CompositeMethod::Median)).unwrap();
    for band in Band::REFLECTANCE {
        let data = composite.image.band(band).unwrap();
        assert!(data[[0, 0]].is_finite());
        assert!(data[[0, 1]].is_nan(), "{band} should be masked");
    }
}

#[test]
fn test_acquisition_dates_sorted_and_distinct() {
    let g = grid(1, 1);
    let p = provider(vec![
        uniform_scene("c", at(2024, 3, 20), &g, Cover::Water),
        uniform_scene("a", at(2024, 3, 4), &g, Cover::Water),
        uniform_scene("b", at(2024, 3, 4), &g, Cover::Healthy),
    ]);
    let region = whole(1, 1);
    let composite = build_composite(p.as_ref(), &request(&region, CompositeMethod::Median)).unwrap();
    assert_eq!(
        composite.image.acquisition_dates(),
        &[date(2024, 3, 4), date(2024, 3, 20)]
    );
    assert_eq!(composite.scene_count, 3);
}

#[test]
fn test_pixels_outside_region_are_clipped() {
    let g = grid(2, 4);
    let p = provider(vec![uniform_scene("s", at(2024, 3, 5), &g, Cover::Healthy)]);
    let west = Region::from_rect("west", (0.0, 0.0), (20.0, 20.0));
    let composite = build_composite(p.as_ref(), &request(&west, CompositeMethod::Median)).unwrap();
    let red = composite.image.band(Band::Red).unwrap();
    for row in 0..2 {
        assert!(red[[row, 0]].is_finite() && red[[row, 1]].is_finite());
        assert!(red[[row, 2]].is_nan() && red[[row, 3]].is_nan());
    }
}

#[test]
fn test_grid_mismatch_is_reported() {
    let p = provider(vec![
        uniform_scene("a", at(2024, 3, 5), &grid(2, 2), Cover::Water),
        uniform_scene("b", at(2024, 3, 9), &GridSpec::projected(0.0, 20.0, 10.0, 2, 3), Cover::Water),
    ]);
    let region = whole(2, 2);
    let err = build_composite(p.as_ref(), &request(&region, CompositeMethod::Median)).unwrap_err();
    assert_eq!(err.code(), "GRID_MISMATCH");
}

#[test]
fn test_composite_carries_sensor_and_product() {
    let g = grid(1, 1);
    let p = std::sync::Arc::new(InMemoryProvider::new(
        "sentinel-2b",
        vec![uniform_scene("a", at(2024, 3, 5), &g, Cover::Water)],
    ));
    let region = whole(1, 1);
    let composite = build_composite(p.as_ref(), &request(&region, CompositeMethod::Median)).unwrap();
    assert_eq!(composite.image.sensor(), "sentinel-2b");
    assert_eq!(composite.image.product(), ProductLevel::SurfaceReflectance);
}

// ---------------------------------------------------------------------------
// Historical product
// ---------------------------------------------------------------------------

#[test]
fn test_top_of_atmosphere_cutoff() {
    assert!(uses_top_of_atmosphere(&period(date(2018, 12, 1), date(2019, 2, 1))));
    assert!(!uses_top_of_atmosphere(&period(date(2019, 1, 1), date(2019, 2, 1))));
}

#[test]
fn test_historical_window_uses_unmasked_toa_mosaic() {
    let g = grid(1, 1);
    let toa = scene_with(
        "toa",
        at(2018, 6, 10),
        10.0,
        ProductLevel::TopOfAtmosphere,
        &g,
        |_, _| Cover::Water,
        |_, _| SCL_CLOUD,
    );
    let sr = scene_with(
        "sr",
        at(2018, 6, 12),
        10.0,
        ProductLevel::SurfaceReflectance,
        &g,
        |_, _| Cover::Healthy,
        |_, _| SCL_CLEAR,
    );
    let p = provider(vec![sr, toa]);
    let region = whole(1, 1);
    let req = CompositeRequest {
        region: &region,
        period: period(date(2018, 6, 1), date(2018, 7, 1)),
        max_cloud_pct: 30.0,
        method: CompositeMethod::Median,
    };
    let composite = build_composite(p.as_ref(), &req).unwrap();
    assert_eq!(composite.image.product(), ProductLevel::TopOfAtmosphere);
    assert_eq!(composite.method, CompositeMethod::Mosaic);
    assert_eq!(composite.scene_count, 1);
    // SCL is ignored on this path, so the clouded value survives.
    assert_eq!(composite.image.band(Band::Nir).unwrap()[[0, 0]], Cover::Water.reflectance()[3]);
}
