mod common;

use std::time::{Duration, Instant};

use approx::assert_abs_diff_eq;
use ndarray::Array2;

use hydrosat_core::aggregate::{aggregate, label_components, vectorize, AggregationOptions, Vectorized};
use hydrosat_core::classify::{ClassMap, ParcelClass};
use hydrosat_core::region::Region;

use common::grid;

/// Class map where `f(row, col)` gives each pixel's class.
fn class_map(rows: usize, cols: usize, f: impl Fn(usize, usize) -> Option<ParcelClass>) -> ClassMap {
    ClassMap {
        grid: grid(rows, cols),
        classes: Array2::from_shape_fn((rows, cols), |(r, c)| f(r, c)),
    }
}

fn whole(rows: usize, cols: usize) -> Region {
    Region::from_rect("test", (0.0, 0.0), (cols as f64 * 10.0, rows as f64 * 10.0))
}

/// West half water, east half healthy, one waterlogged row at the top.
fn split_map() -> ClassMap {
    class_map(10, 10, |r, c| {
        Some(if r == 0 {
            ParcelClass::Waterlogged
        } else if c < 5 {
            ParcelClass::SurfaceWater
        } else {
            ParcelClass::HealthyCrop
        })
    })
}

// ---------------------------------------------------------------------------
// Areas
// ---------------------------------------------------------------------------

#[test]
fn test_class_areas_sum_to_total() {
    let report = aggregate(&split_map(), &whole(10, 10), &AggregationOptions::default());
    // 100 pixels of 0.01 ha
    assert_abs_diff_eq!(report.area_total_ha, 1.0, epsilon = 1e-9);
    let sum: f64 = report.classes.values().map(|c| c.hectares).sum();
    assert_abs_diff_eq!(sum, report.area_total_ha, epsilon = 1e-6);
    let pct: f64 = report.classes.values().map(|c| c.percent).sum();
    assert_abs_diff_eq!(pct, 100.0, epsilon = 0.05);
    assert!(!report.approximate);
}

#[test]
fn test_class_percentages() {
    let report = aggregate(&split_map(), &whole(10, 10), &AggregationOptions::default());
    assert_abs_diff_eq!(report.percent(ParcelClass::Waterlogged), 10.0, epsilon = 1e-9);
    assert_abs_diff_eq!(report.percent(ParcelClass::SurfaceWater), 45.0, epsilon = 1e-9);
    assert_abs_diff_eq!(report.percent(ParcelClass::HealthyCrop), 45.0, epsilon = 1e-9);
    assert_abs_diff_eq!(report.percent(ParcelClass::BareSoil), 0.0);
    assert_eq!(report.classes.len(), 5);
}

#[test]
fn test_summary_rollup() {
    let report = aggregate(&split_map(), &whole(10, 10), &AggregationOptions::default());
    let s = &report.summary;
    assert_abs_diff_eq!(s.water_ha, 0.45, epsilon = 1e-9);
    assert_abs_diff_eq!(s.waterlogged_ha, 0.1, epsilon = 1e-9);
    assert_abs_diff_eq!(s.productive_ha, 0.45, epsilon = 1e-9);
    assert_abs_diff_eq!(s.problematic_ha, 0.55, epsilon = 1e-9);
    assert_abs_diff_eq!(s.problematic_pct, 55.0, epsilon = 1e-9);
}

#[test]
fn test_masked_pixels_do_not_count() {
    let map = class_map(4, 4, |r, _| (r < 2).then_some(ParcelClass::BareSoil));
    let report = aggregate(&map, &whole(4, 4), &AggregationOptions::default());
    assert_abs_diff_eq!(report.area_total_ha, 0.08, epsilon = 1e-9);
    assert_abs_diff_eq!(report.percent(ParcelClass::BareSoil), 100.0, epsilon = 1e-9);
}

#[test]
fn test_only_pixels_inside_region_count() {
    let west = Region::from_rect("west", (0.0, 0.0), (50.0, 100.0));
    let report = aggregate(&split_map(), &west, &AggregationOptions::default());
    // 5 columns x 10 rows; top row waterlogged, the rest water
    assert_abs_diff_eq!(report.area_total_ha, 0.5, epsilon = 1e-9);
    assert_abs_diff_eq!(report.hectares(ParcelClass::HealthyCrop), 0.0);
    assert_abs_diff_eq!(report.summary.problematic_pct, 100.0, epsilon = 1e-9);
}

#[test]
fn test_empty_region_reports_zero() {
    let map = class_map(4, 4, |_, _| None);
    let report = aggregate(&map, &whole(4, 4), &AggregationOptions::default());
    assert_eq!(report.area_total_ha, 0.0);
    assert_eq!(report.summary.problematic_pct, 0.0);
    assert!(report.classes.values().all(|c| c.percent == 0.0));
}

#[test]
fn test_pixel_budget_marks_result_approximate() {
    let options = AggregationOptions {
        max_pixels: 25,
        ..AggregationOptions::default()
    };
    let report = aggregate(&split_map(), &whole(10, 10), &options);
    assert!(report.approximate);
    // Stride 2 keeps the total close to the full count.
    assert_abs_diff_eq!(report.area_total_ha, 1.0, epsilon = 1e-9);
    let pct: f64 = report.classes.values().map(|c| c.percent).sum();
    assert_abs_diff_eq!(pct, 100.0, epsilon = 0.05);
}

#[test]
fn test_sampling_weights_partial_edge_blocks() {
    // 9x9 at stride 2: the last sampled row and column cover one pixel each.
    let map = class_map(9, 9, |_, _| Some(ParcelClass::HealthyCrop));
    let options = AggregationOptions {
        max_pixels: 25,
        ..AggregationOptions::default()
    };
    let report = aggregate(&map, &whole(9, 9), &options);
    assert!(report.approximate);
    assert_abs_diff_eq!(report.area_total_ha, 0.81, epsilon = 1e-9);
}

// ---------------------------------------------------------------------------
// Vectors
// ---------------------------------------------------------------------------

#[test]
fn test_components_are_per_class() {
    let (_, components) = label_components(&split_map().classes);
    assert_eq!(components.len(), 3);
    assert_eq!(components.iter().map(|c| c.area).sum::<usize>(), 100);
    let waterlogged = components
        .iter()
        .find(|c| c.class == ParcelClass::Waterlogged)
        .unwrap();
    assert_eq!(waterlogged.area, 10);
}

#[test]
fn test_vectors_off_by_default() {
    let report = aggregate(&split_map(), &whole(10, 10), &AggregationOptions::default());
    assert!(report.geojson.is_none());
    assert!(report.vector_omitted.is_none());
    let json = serde_json::to_value(&report).unwrap();
    assert!(json.get("geojson").is_none());
}

#[test]
fn test_vectorize_produces_one_feature_per_component() {
    let options = AggregationOptions {
        vectorize: true,
        simplify_tolerance: 0.0,
        ..AggregationOptions::default()
    };
    let report = aggregate(&split_map(), &whole(10, 10), &options);
    let fc = report.geojson.expect("features");
    assert_eq!(fc.kind, "FeatureCollection");
    assert_eq!(fc.features.len(), 3);

    let total: f64 = fc.features.iter().map(|f| f.properties.area_ha).sum();
    assert_abs_diff_eq!(total, 1.0, epsilon = 1e-6);

    for feature in &fc.features {
        assert_eq!(feature.geometry.kind, "Polygon");
        let exterior = &feature.geometry.coordinates[0];
        assert!(exterior.len() >= 4);
        assert_eq!(exterior.first(), exterior.last());
    }

    let row = fc
        .features
        .iter()
        .find(|f| f.properties.class_name == "waterlogged")
        .unwrap();
    let xs: Vec<f64> = row.geometry.coordinates[0].iter().map(|p| p[0]).collect();
    let ys: Vec<f64> = row.geometry.coordinates[0].iter().map(|p| p[1]).collect();
    assert_eq!(xs.iter().cloned().fold(f64::INFINITY, f64::min), 0.0);
    assert_eq!(xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max), 100.0);
    assert_eq!(ys.iter().cloned().fold(f64::INFINITY, f64::min), 90.0);
    assert_eq!(ys.iter().cloned().fold(f64::NEG_INFINITY, f64::max), 100.0);
}

#[test]
fn test_hole_becomes_interior_ring() {
    // Water ring around a healthy centre pixel.
    let map = class_map(3, 3, |r, c| {
        Some(if r == 1 && c == 1 {
            ParcelClass::HealthyCrop
        } else {
            ParcelClass::SurfaceWater
        })
    });
    let Vectorized::Features(fc) = vectorize(&map, 100, 0.0) else {
        panic!("expected features");
    };
    let water = fc
        .features
        .iter()
        .find(|f| f.properties.class_id == ParcelClass::SurfaceWater.id())
        .unwrap();
    assert_eq!(water.geometry.coordinates.len(), 2);
    assert_abs_diff_eq!(water.properties.area_ha, 0.08, epsilon = 1e-9);
}

#[test]
fn test_vectors_omitted_over_cap() {
    // Checkerboard: every pixel is its own component.
    let map = class_map(6, 6, |r, c| {
        Some(if (r + c) % 2 == 0 {
            ParcelClass::SurfaceWater
        } else {
            ParcelClass::Stubble
        })
    });
    let options = AggregationOptions {
        vectorize: true,
        max_vector_features: 10,
        ..AggregationOptions::default()
    };
    let report = aggregate(&map, &whole(6, 6), &options);
    assert!(report.geojson.is_none());
    let omitted = report.vector_omitted.expect("omission notice");
    assert_eq!(omitted.feature_count, 36);
    assert_eq!(omitted.cap, 10);
    // Areas are unaffected.
    assert_abs_diff_eq!(report.area_total_ha, 0.36, epsilon = 1e-9);
}

#[test]
fn test_options_validate() {
    AggregationOptions::default().validate().unwrap();
    let bad = AggregationOptions {
        max_pixels: 0,
        ..AggregationOptions::default()
    };
    assert_eq!(bad.validate().unwrap_err().code(), "INVALID_CONFIG");
    let bad = AggregationOptions {
        simplify_tolerance: -1.0,
        ..AggregationOptions::default()
    };
    assert!(bad.validate().is_err());
}

#[test]
fn test_vectorize_many_components_on_large_map() {
    // 1000x1000 checkerboard of 25 px blocks: 1,600 components.
    let map = class_map(1000, 1000, |r, c| {
        Some(if (r / 25 + c / 25) % 2 == 0 {
            ParcelClass::SurfaceWater
        } else {
            ParcelClass::HealthyCrop
        })
    });
    let started = Instant::now();
    let Vectorized::Features(fc) = vectorize(&map, 2000, 50.0) else {
        panic!("expected features under the cap");
    };
    let elapsed = started.elapsed();
    assert_eq!(fc.features.len(), 1600);
    for feature in &fc.features {
        assert_eq!(feature.geometry.coordinates.len(), 1);
        assert_abs_diff_eq!(feature.properties.area_ha, 6.25, epsilon = 1e-9);
    }
    // Each component is traced from its own bounding box.
    assert!(elapsed < Duration::from_secs(5), "vectorize took {elapsed:?}");
}
