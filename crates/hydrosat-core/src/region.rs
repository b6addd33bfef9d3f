//! Region catalog: the consortium zone, its four watersheds and caller-supplied
//! geometries.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use geo::{coord, Area, BooleanOps, BoundingRect, Contains, Intersects, MultiPolygon, Point, Polygon, Rect};
use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::consts::{CONSORTIUM_AREA_HA, M2_PER_HECTARE, PARALLEL_PIXEL_THRESHOLD};
use crate::error::{HydrosatError, Result};
use crate::raster::GridSpec;

/// Key of the whole consortium zone.
pub const ZONE_KEY: &str = "zona";

/// The four drainage sub-regions used for reporting and alerting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Watershed {
    Candil,
    Ml,
    Noroeste,
    Norte,
}

impl Watershed {
    pub const ALL: [Watershed; 4] = [
        Watershed::Candil,
        Watershed::Ml,
        Watershed::Noroeste,
        Watershed::Norte,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Candil => "candil",
            Self::Ml => "ml",
            Self::Noroeste => "noroeste",
            Self::Norte => "norte",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Candil => "Candil",
            Self::Ml => "ML",
            Self::Noroeste => "Noroeste",
            Self::Norte => "Norte",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Self::Candil => "#2196F3",
            Self::Ml => "#4CAF50",
            Self::Noroeste => "#FF9800",
            Self::Norte => "#9C27B0",
        }
    }

    pub fn reference_area_ha(self) -> f64 {
        match self {
            Self::Candil => 18_800.0,
            Self::Ml => 18_900.0,
            Self::Noroeste => 18_500.0,
            Self::Norte => 18_300.0,
        }
    }
}

impl fmt::Display for Watershed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Watershed {
    type Err = HydrosatError;

    fn from_str(s: &str) -> Result<Self> {
        Watershed::ALL
            .into_iter()
            .find(|w| w.key().eq_ignore_ascii_case(s))
            .ok_or_else(|| unknown_region(s))
    }
}

fn unknown_region(key: &str) -> HydrosatError {
    let mut available = vec![ZONE_KEY];
    available.extend(Watershed::ALL.iter().map(|w| w.key()));
    HydrosatError::UnknownRegion {
        key: key.to_string(),
        available: available.join(", "),
    }
}

/// A named analysis geometry.
#[derive(Clone, Debug)]
pub struct Region {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
    /// Surveyed area, when known, in hectares.
    pub reference_area_ha: Option<f64>,
}

impl Region {
    pub fn new(name: impl Into<String>, geometry: MultiPolygon<f64>) -> Self {
        Self {
            name: name.into(),
            geometry,
            reference_area_ha: None,
        }
    }

    pub fn from_polygon(name: impl Into<String>, polygon: Polygon<f64>) -> Self {
        Self::new(name, MultiPolygon::new(vec![polygon]))
    }

    pub fn from_rect(name: impl Into<String>, min: (f64, f64), max: (f64, f64)) -> Self {
        let rect = Rect::new(coord! { x: min.0, y: min.1 }, coord! { x: max.0, y: max.1 });
        Self::from_polygon(name, rect.to_polygon())
    }

    pub fn with_reference_area(mut self, hectares: f64) -> Self {
        self.reference_area_ha = Some(hectares);
        self
    }

    /// Planar geometry area in hectares (map units are assumed to be metres).
    pub fn geometry_area_ha(&self) -> f64 {
        self.geometry.unsigned_area() / M2_PER_HECTARE
    }

    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.geometry.bounding_rect()
    }

    pub fn intersects_grid(&self, grid: &GridSpec) -> bool {
        self.geometry.intersects(&grid.bounds())
    }

    /// Pixels whose centre falls inside the region.
    pub fn pixel_mask(&self, grid: &GridSpec) -> Array2<bool> {
        let (h, w) = grid.dim();
        let Some(bounds) = self.bounds() else {
            return Array2::from_elem((h, w), false);
        };

        let row_mask = |row: usize| -> Vec<bool> {
            (0..w)
                .map(|col| {
                    let (x, y) = grid.pixel_center(row, col);
                    x >= bounds.min().x
                        && x <= bounds.max().x
                        && y >= bounds.min().y
                        && y <= bounds.max().y
                        && self.geometry.contains(&Point::new(x, y))
                })
                .collect()
        };

        let flat: Vec<bool> = if h * w >= PARALLEL_PIXEL_THRESHOLD {
            (0..h).into_par_iter().flat_map_iter(row_mask).collect()
        } else {
            (0..h).flat_map(row_mask).collect()
        };
        Array2::from_shape_vec((h, w), flat).unwrap_or_else(|_| Array2::from_elem((h, w), false))
    }
}

/// How a caller names the area to analyse.
#[derive(Clone, Debug)]
pub enum RegionSelector {
    Zone,
    Watershed(Watershed),
    /// Caller geometry; intersected with the consortium zone on resolution.
    Custom(Region),
}

impl RegionSelector {
    pub fn key(&self) -> String {
        match self {
            Self::Zone => ZONE_KEY.to_string(),
            Self::Watershed(w) => w.key().to_string(),
            Self::Custom(region) => region.name.clone(),
        }
    }
}

impl FromStr for RegionSelector {
    type Err = HydrosatError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case(ZONE_KEY) || s.eq_ignore_ascii_case("zone") {
            return Ok(Self::Zone);
        }
        s.parse::<Watershed>().map(Self::Watershed)
    }
}

/// Resolves region selectors to geometries.
#[derive(Clone, Debug)]
pub struct RegionCatalog {
    zone: Region,
    watersheds: BTreeMap<Watershed, Region>,
}

impl RegionCatalog {
    pub fn new(zone: Region, watersheds: impl IntoIterator<Item = (Watershed, Region)>) -> Self {
        Self {
            zone,
            watersheds: watersheds.into_iter().collect(),
        }
    }

    /// Default layout in a local projected frame (metres): the four
    /// watersheds side by side, 10 km wide, each sized to its reference area,
    /// inside a 40 km wide zone sized to the consortium area.
    pub fn consortium() -> Self {
        const WIDTH_M: f64 = 10_000.0;
        let zone_height = CONSORTIUM_AREA_HA * M2_PER_HECTARE / (4.0 * WIDTH_M);
        let zone = Region::from_rect(ZONE_KEY, (0.0, 0.0), (4.0 * WIDTH_M, zone_height))
            .with_reference_area(CONSORTIUM_AREA_HA);

        let watersheds = Watershed::ALL.into_iter().enumerate().map(|(i, w)| {
            let x0 = i as f64 * WIDTH_M;
            let height = w.reference_area_ha() * M2_PER_HECTARE / WIDTH_M;
            let region = Region::from_rect(w.key(), (x0, 0.0), (x0 + WIDTH_M, height))
                .with_reference_area(w.reference_area_ha());
            (w, region)
        });

        Self::new(zone, watersheds)
    }

    pub fn zone(&self) -> &Region {
        &self.zone
    }

    pub fn watershed(&self, watershed: Watershed) -> Result<&Region> {
        self.watersheds
            .get(&watershed)
            .ok_or_else(|| unknown_region(watershed.key()))
    }

    pub fn watersheds(&self) -> impl Iterator<Item = (Watershed, &Region)> {
        self.watersheds.iter().map(|(w, r)| (*w, r))
    }

    pub fn resolve(&self, selector: &RegionSelector) -> Result<Region> {
        match selector {
            RegionSelector::Zone => Ok(self.zone.clone()),
            RegionSelector::Watershed(w) => self.watershed(*w).cloned(),
            RegionSelector::Custom(region) => {
                let clipped = region.geometry.intersection(&self.zone.geometry);
                Ok(Region::new(region.name.clone(), clipped))
            }
        }
    }
}
