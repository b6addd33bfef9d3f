mod common;

use hydrosat_core::classify::{
    classify, classify_pixel, ClassificationThresholds, ParcelClass, FALLBACK, RULES,
};
use hydrosat_core::indices::{compute_indices, PixelIndices};
use hydrosat_core::composite::{build_composite, CompositeMethod, CompositeRequest};
use hydrosat_core::region::Region;

use common::{grid, march_2024, provider, scene, Cover, PIXEL_M};

fn px(ndvi: f32, ndwi: f32, mndwi: f32, ndmi: f32, bsi: f32) -> PixelIndices {
    PixelIndices {
        ndvi,
        ndwi,
        mndwi,
        ndmi,
        bsi,
    }
}

fn default_class(p: PixelIndices) -> ParcelClass {
    classify_pixel(&p, &ClassificationThresholds::default())
}

// ---------------------------------------------------------------------------
// Rule table
// ---------------------------------------------------------------------------

#[test]
fn test_rule_order() {
    let order: Vec<ParcelClass> = RULES.iter().map(|r| r.class).collect();
    assert_eq!(
        order,
        vec![
            ParcelClass::SurfaceWater,
            ParcelClass::Waterlogged,
            ParcelClass::HealthyCrop,
            ParcelClass::BareSoil,
        ]
    );
    assert_eq!(FALLBACK, ParcelClass::Stubble);
}

#[test]
fn test_open_water_by_mndwi() {
    assert_eq!(default_class(px(-0.2, 0.1, 0.3, -0.5, 0.0)), ParcelClass::SurfaceWater);
}

#[test]
fn test_open_water_by_ndwi_when_not_vegetated() {
    // mndwi below the water cut, but ndwi high and ndvi low
    assert_eq!(default_class(px(0.05, 0.4, 0.1, 0.0, 0.0)), ParcelClass::SurfaceWater);
    // same ndwi with vegetation is not water
    assert_ne!(default_class(px(0.2, 0.4, 0.1, 0.0, 0.0)), ParcelClass::SurfaceWater);
}

#[test]
fn test_waterlogged_by_moderate_mndwi() {
    assert_eq!(default_class(px(0.1, 0.0, 0.0, 0.0, 0.0)), ParcelClass::Waterlogged);
}

#[test]
fn test_waterlogged_by_moisture() {
    assert_eq!(default_class(px(0.1, 0.0, -0.5, 0.3, 0.0)), ParcelClass::Waterlogged);
}

#[test]
fn test_healthy_crop() {
    assert_eq!(default_class(px(0.6, -0.5, -0.3, 0.1, -0.2)), ParcelClass::HealthyCrop);
}

#[test]
fn test_healthy_crop_needs_moderate_moisture() {
    // ndmi above the healthy band falls through to the fallback
    assert_eq!(default_class(px(0.6, -0.5, -0.3, 0.5, -0.2)), ParcelClass::Stubble);
}

#[test]
fn test_bare_soil() {
    assert_eq!(default_class(px(0.05, -0.1, -0.3, 0.0, 0.1)), ParcelClass::BareSoil);
}

#[test]
fn test_fallback_is_stubble() {
    assert_eq!(default_class(px(0.2, -0.2, -0.3, 0.0, 0.0)), ParcelClass::Stubble);
}

#[test]
fn test_first_match_wins() {
    // Satisfies both the water and the waterlogged predicates.
    let p = px(0.05, 0.5, 0.5, 0.3, 0.0);
    assert!((RULES[1].matches)(&p, &ClassificationThresholds::default()));
    assert_eq!(default_class(p), ParcelClass::SurfaceWater);
}

#[test]
fn test_every_pixel_gets_one_class() {
    let t = ClassificationThresholds::default();
    let steps = [-0.9f32, -0.4, -0.15, 0.0, 0.12, 0.2, 0.3, 0.45, 0.9];
    for &ndvi in &steps {
        for &mndwi in &steps {
            for &ndmi in &steps {
                let p = px(ndvi, 0.0, mndwi, ndmi, 0.1);
                let class = classify_pixel(&p, &t);
                let first = RULES.iter().find(|r| (r.matches)(&p, &t)).map(|r| r.class);
                assert_eq!(class, first.unwrap_or(FALLBACK));
            }
        }
    }
}

#[test]
fn test_custom_thresholds_shift_boundaries() {
    let p = px(-0.2, 0.1, 0.3, -0.5, 0.0);
    let strict = ClassificationThresholds {
        water_mndwi: 0.5,
        ..ClassificationThresholds::default()
    };
    assert_eq!(default_class(p), ParcelClass::SurfaceWater);
    assert_ne!(classify_pixel(&p, &strict), ParcelClass::SurfaceWater);
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

#[test]
fn test_default_thresholds_validate() {
    ClassificationThresholds::default().validate().unwrap();
}

#[test]
fn test_threshold_out_of_range_rejected() {
    let bad = ClassificationThresholds {
        healthy_ndvi_min: 1.5,
        ..ClassificationThresholds::default()
    };
    let err = bad.validate().unwrap_err();
    assert_eq!(err.code(), "INVALID_CONFIG");
    assert!(err.to_string().contains("healthy_ndvi_min"));
}

#[test]
fn test_threshold_ordering_rejected() {
    let bad = ClassificationThresholds {
        waterlogged_mndwi_min: 0.2,
        ..ClassificationThresholds::default()
    };
    assert!(bad.validate().is_err());

    let bad = ClassificationThresholds {
        healthy_ndmi_min: 0.5,
        ..ClassificationThresholds::default()
    };
    assert!(bad.validate().is_err());
}

// ---------------------------------------------------------------------------
// Raster classification
// ---------------------------------------------------------------------------

#[test]
fn test_reflectance_presets_classify() {
    let g = grid(1, 5);
    let covers = [
        Cover::Water,
        Cover::Waterlogged,
        Cover::Healthy,
        Cover::BareSoil,
        Cover::Stubble,
    ];
    let s = scene("s1", common::at(2024, 3, 5), 5.0, &g, move |_, c| covers[c]);
    let p = provider(vec![s]);
    let region = Region::from_rect("all", (0.0, 0.0), (5.0 * PIXEL_M, PIXEL_M));
    let composite = build_composite(
        p.as_ref(),
        &CompositeRequest {
            region: &region,
            period: march_2024(),
            max_cloud_pct: 30.0,
            method: CompositeMethod::Median,
        },
    )
    .unwrap();
    let indices = compute_indices(&composite.image).unwrap();
    let map = classify(&indices, &ClassificationThresholds::default());

    assert_eq!(map.get(0, 0), Some(ParcelClass::SurfaceWater));
    assert_eq!(map.get(0, 1), Some(ParcelClass::Waterlogged));
    assert_eq!(map.get(0, 2), Some(ParcelClass::HealthyCrop));
    assert_eq!(map.get(0, 3), Some(ParcelClass::BareSoil));
    assert_eq!(map.get(0, 4), Some(ParcelClass::Stubble));
    assert_eq!(map.pixel_counts(), [1, 1, 1, 1, 1]);
}

#[test]
fn test_invalid_pixels_stay_unclassified() {
    let g = grid(2, 2);
    let s = common::scene_with(
        "s1",
        common::at(2024, 3, 5),
        5.0,
        hydrosat_core::raster::ProductLevel::SurfaceReflectance,
        &g,
        |_, _| Cover::Healthy,
        |r, c| if r == 0 && c == 0 { common::SCL_CLOUD } else { common::SCL_CLEAR },
    );
    let p = provider(vec![s]);
    let region = Region::from_rect("all", (0.0, 0.0), (20.0, 20.0));
    let composite = build_composite(
        p.as_ref(),
        &CompositeRequest {
            region: &region,
            period: march_2024(),
            max_cloud_pct: 30.0,
            method: CompositeMethod::Median,
        },
    )
    .unwrap();
    let map = classify(
        &compute_indices(&composite.image).unwrap(),
        &ClassificationThresholds::default(),
    );

    assert_eq!(map.get(0, 0), None);
    assert_eq!(map.get(1, 1), Some(ParcelClass::HealthyCrop));
    assert_eq!(map.pixel_counts().iter().sum::<usize>(), 3);
}

#[test]
fn test_class_metadata() {
    let ids: Vec<u8> = ParcelClass::ALL.iter().map(|c| c.id()).collect();
    assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    assert!(ParcelClass::SurfaceWater.is_problematic());
    assert!(ParcelClass::Waterlogged.is_problematic());
    assert!(!ParcelClass::BareSoil.is_problematic());
    assert_eq!(
        serde_json::to_string(&ParcelClass::HealthyCrop).unwrap(),
        "\"healthy_crop\""
    );
}
