mod common;

use std::io::Write;
use std::sync::Arc;

use serde_json::json;

use hydrosat_core::classify::ParcelClass;
use hydrosat_core::imagery::{load_catalog, ImageryProvider};
use hydrosat_core::monitor::{ClassificationRequest, MonitorConfig, MonitoringService};
use hydrosat_core::raster::Band;
use hydrosat_core::region::RegionSelector;

use common::{march_2024, strip_catalog, Cover};

/// Catalog document for a 2x4 grid: west half water, east half healthy.
fn catalog_json(cloud_pct: f32) -> String {
    let covers = [
        Cover::Water,
        Cover::Water,
        Cover::Healthy,
        Cover::Healthy,
    ];
    let band = |i: usize| -> Vec<f32> {
        (0..2)
            .flat_map(|_| covers.iter().map(move |c| c.reflectance()[i]))
            .collect()
    };
    json!({
        "sensor": "sentinel-2a",
        "scenes": [{
            "id": "S2A_20240305",
            "acquired": "2024-03-05T14:07:00Z",
            "cloud_pct": cloud_pct,
            "grid": { "origin_x": 0.0, "origin_y": 20.0, "pixel_width": 10.0,
                      "pixel_height": 10.0, "rows": 2, "cols": 4 },
            "bands": {
                "B2": band(0), "B3": band(1), "B4": band(2), "B8": band(3), "B11": band(4),
                "SCL": vec![4.0f32; 8]
            }
        }]
    })
    .to_string()
}

fn write_catalog(cloud_pct: f32) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(catalog_json(cloud_pct).as_bytes()).unwrap();
    file
}

#[test]
fn test_load_catalog_from_file() {
    let file = write_catalog(12.0);
    let provider = load_catalog(file.path()).unwrap();
    assert_eq!(provider.sensor(), "sentinel-2a");
    assert_eq!(provider.scenes().len(), 1);
    let scene = &provider.scenes()[0];
    assert_eq!(scene.grid.dim(), (2, 4));
    assert_eq!(scene.band(Band::Nir).unwrap()[[1, 3]], Cover::Healthy.reflectance()[3]);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_catalog(&dir.path().join("absent.json")).unwrap_err();
    assert_eq!(err.code(), "IO_ERROR");
    assert_eq!(err.safe_message(), "The scene catalog could not be read");
}

#[test]
fn test_malformed_catalog_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"{ \"scenes\": [ {").unwrap();
    let err = load_catalog(file.path()).unwrap_err();
    assert_eq!(err.code(), "INVALID_JSON");
}

#[test]
fn test_catalog_drives_classification() {
    let file = write_catalog(12.0);
    let provider = Arc::new(load_catalog(file.path()).unwrap());
    let svc = MonitoringService::new(provider, strip_catalog(2, 4), MonitorConfig::default()).unwrap();
    let result = svc
        .classify(&ClassificationRequest::new(RegionSelector::Zone, march_2024()))
        .unwrap();
    assert_eq!(result.parameters.sensor, "sentinel-2a");
    assert!((result.percent(ParcelClass::SurfaceWater) - 50.0).abs() < 1e-9);
    assert!((result.percent(ParcelClass::HealthyCrop) - 50.0).abs() < 1e-9);
}

#[test]
fn test_cloudy_catalog_scene_is_filtered() {
    let file = write_catalog(45.0);
    let provider = Arc::new(load_catalog(file.path()).unwrap());
    let svc = MonitoringService::new(provider, strip_catalog(2, 4), MonitorConfig::default()).unwrap();
    let err = svc
        .classify(&ClassificationRequest::new(RegionSelector::Zone, march_2024()))
        .unwrap_err();
    assert_eq!(err.code(), "NO_IMAGERY");
}
