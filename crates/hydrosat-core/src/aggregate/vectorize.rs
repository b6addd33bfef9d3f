//! Classified raster to simplified polygons.

use std::collections::HashMap;

use geo::{Coord, LineString, Polygon, Simplify};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::classify::{ClassMap, ParcelClass};
use crate::consts::M2_PER_HECTARE;
use crate::raster::GridSpec;

/// A 4-connected run of pixels sharing one class.
#[derive(Clone, Debug)]
pub struct ClassComponent {
    pub label: u32,
    pub class: ParcelClass,
    /// Number of pixels in the component.
    pub area: usize,
    /// Bounding box: (min_row, max_row, min_col, max_col).
    pub bbox: (usize, usize, usize, usize),
}

/// Vectors were not produced because the component count exceeded the cap.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorOmission {
    pub feature_count: usize,
    pub cap: usize,
}

/// GeoJSON-shaped feature collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<Feature>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
    pub geometry: PolygonGeometry,
    pub properties: FeatureProperties,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolygonGeometry {
    #[serde(rename = "type")]
    pub kind: String,
    /// Exterior ring first, then holes; each ring closed.
    pub coordinates: Vec<Vec<[f64; 2]>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureProperties {
    pub class_id: u8,
    pub class_name: String,
    pub class_label: String,
    pub color: String,
    pub area_ha: f64,
}

/// Outcome of a vectorisation attempt.
#[derive(Clone, Debug)]
pub enum Vectorized {
    Features(FeatureCollection),
    Omitted(VectorOmission),
}

/// Label 4-connected same-class components with two-pass union-find.
///
/// Returns the resolved label raster (0 = masked) and the components sorted
/// by area descending.
pub fn label_components(classes: &Array2<Option<ParcelClass>>) -> (Array2<u32>, Vec<ClassComponent>) {
    let (h, w) = classes.dim();
    let mut labels = Array2::<u32>::zeros((h, w));
    if h == 0 || w == 0 {
        return (labels, Vec::new());
    }

    let mut next_label: u32 = 1;
    // Index 0 unused; labels start at 1.
    let mut parent: Vec<u32> = vec![0; h * w / 2 + 2];

    for row in 0..h {
        for col in 0..w {
            let Some(class) = classes[[row, col]] else {
                continue;
            };
            let up = if row > 0 && classes[[row - 1, col]] == Some(class) {
                labels[[row - 1, col]]
            } else {
                0
            };
            let left = if col > 0 && classes[[row, col - 1]] == Some(class) {
                labels[[row, col - 1]]
            } else {
                0
            };

            labels[[row, col]] = match (up > 0, left > 0) {
                (false, false) => {
                    if next_label as usize >= parent.len() {
                        parent.resize(parent.len() * 2, 0);
                    }
                    parent[next_label as usize] = next_label;
                    next_label += 1;
                    next_label - 1
                }
                (true, false) => up,
                (false, true) => left,
                (true, true) => {
                    if up != left {
                        union(&mut parent, up, left);
                    }
                    up.min(left)
                }
            };
        }
    }

    for i in 1..next_label as usize {
        parent[i] = find(&parent, i as u32);
    }

    let mut by_root = HashMap::<u32, ClassComponent>::new();
    for ((row, col), label) in labels.indexed_iter_mut() {
        if *label == 0 {
            continue;
        }
        let root = parent[*label as usize];
        *label = root;
        if let Some(class) = classes[[row, col]] {
            let entry = by_root.entry(root).or_insert(ClassComponent {
                label: root,
                class,
                area: 0,
                bbox: (row, row, col, col),
            });
            entry.area += 1;
            entry.bbox.0 = entry.bbox.0.min(row);
            entry.bbox.1 = entry.bbox.1.max(row);
            entry.bbox.2 = entry.bbox.2.min(col);
            entry.bbox.3 = entry.bbox.3.max(col);
        }
    }

    let mut components: Vec<ClassComponent> = by_root.into_values().collect();
    components.sort_unstable_by(|a, b| b.area.cmp(&a.area).then(a.label.cmp(&b.label)));
    (labels, components)
}

fn find(parent: &[u32], mut x: u32) -> u32 {
    while parent[x as usize] != x {
        x = parent[x as usize];
    }
    x
}

fn union(parent: &mut [u32], a: u32, b: u32) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        let (small, big) = if ra < rb { (ra, rb) } else { (rb, ra) };
        parent[big as usize] = small;
    }
}

/// Polygonise a class map. More than `max_features` components yields
/// `Vectorized::Omitted`; the payload is never truncated.
pub fn vectorize(map: &ClassMap, max_features: usize, tolerance: f64) -> Vectorized {
    let (labels, components) = label_components(&map.classes);
    if components.len() > max_features {
        warn!(
            features = components.len(),
            cap = max_features,
            "Vector output omitted"
        );
        return Vectorized::Omitted(VectorOmission {
            feature_count: components.len(),
            cap: max_features,
        });
    }

    let features: Vec<Feature> = components
        .iter()
        .filter_map(|component| {
            let polygon = component_polygon(&labels, component, &map.grid)?;
            Some(to_feature(component, simplify_polygon(&polygon, tolerance), &map.grid))
        })
        .collect();

    debug!(features = features.len(), tolerance, "Vectorised class map");
    Vectorized::Features(FeatureCollection {
        kind: "FeatureCollection".to_string(),
        features,
    })
}

type Vertex = (i64, i64);

/// Boundary edges of a component in pixel-corner space (x = col,
/// y = row, y down), oriented with the component on the right-hand side.
/// Only the component's bounding box `(min_row, max_row, min_col, max_col)`
/// is scanned.
fn boundary_edges(
    labels: &Array2<u32>,
    label: u32,
    bbox: (usize, usize, usize, usize),
) -> Vec<(Vertex, Vertex)> {
    let (h, w) = labels.dim();
    let is_in = |r: i64, c: i64| {
        r >= 0 && c >= 0 && (r as usize) < h && (c as usize) < w && labels[[r as usize, c as usize]] == label
    };

    let mut edges = Vec::new();
    let (min_row, max_row, min_col, max_col) = bbox;
    for row in min_row..=max_row {
        for col in min_col..=max_col {
            if labels[[row, col]] != label {
                continue;
            }
            let (r, c) = (row as i64, col as i64);
            if !is_in(r - 1, c) {
                edges.push(((c, r), (c + 1, r)));
            }
            if !is_in(r, c + 1) {
                edges.push(((c + 1, r), (c + 1, r + 1)));
            }
            if !is_in(r + 1, c) {
                edges.push(((c + 1, r + 1), (c, r + 1)));
            }
            if !is_in(r, c - 1) {
                edges.push(((c, r + 1), (c, r)));
            }
        }
    }
    edges
}

/// Chain boundary edges into closed rings. At a vertex shared by two
/// boundary paths the sharpest left turn is taken, so every ring stays
/// simple and a hole may touch the exterior only at a corner.
fn trace_rings(edges: &[(Vertex, Vertex)]) -> Vec<Vec<Vertex>> {
    let mut outgoing: HashMap<Vertex, Vec<usize>> = HashMap::new();
    for (i, (start, _)) in edges.iter().enumerate() {
        outgoing.entry(*start).or_default().push(i);
    }

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();
    for first in 0..edges.len() {
        if used[first] {
            continue;
        }
        let origin = edges[first].0;
        let mut ring = vec![origin];
        let mut current = first;
        loop {
            used[current] = true;
            let (start, end) = edges[current];
            if end == origin {
                break;
            }
            ring.push(end);
            let dir = (end.0 - start.0, end.1 - start.1);
            let Some(next) = next_edge(&outgoing, &used, edges, end, dir) else {
                break;
            };
            current = next;
        }
        ring.push(origin);
        if ring.len() >= 4 {
            rings.push(drop_collinear(ring));
        }
    }
    rings
}

fn next_edge(
    outgoing: &HashMap<Vertex, Vec<usize>>,
    used: &[bool],
    edges: &[(Vertex, Vertex)],
    at: Vertex,
    dir: Vertex,
) -> Option<usize> {
    let candidates = outgoing.get(&at)?;
    let right = (-dir.1, dir.0);
    let left = (dir.1, -dir.0);
    [left, dir, right].into_iter().find_map(|want| {
        candidates.iter().copied().find(|&i| {
            let (s, e) = edges[i];
            !used[i] && (e.0 - s.0, e.1 - s.1) == want
        })
    })
}

/// Remove vertices in the middle of straight runs; input and output rings
/// are closed.
fn drop_collinear(ring: Vec<Vertex>) -> Vec<Vertex> {
    let n = ring.len() - 1;
    let mut out: Vec<Vertex> = (0..n)
        .filter(|&i| {
            let prev = ring[(i + n - 1) % n];
            let here = ring[i];
            let next = ring[(i + 1) % n];
            (here.0 - prev.0) * (next.1 - here.1) != (here.1 - prev.1) * (next.0 - here.0)
        })
        .map(|i| ring[i])
        .collect();
    if let Some(&first) = out.first() {
        out.push(first);
    }
    out
}

/// Twice the signed shoelace area in pixel space; positive for exterior
/// rings under the y-down orientation used by `boundary_edges`.
fn signed_area2(ring: &[Vertex]) -> i64 {
    ring.windows(2)
        .map(|p| p[0].0 * p[1].1 - p[1].0 * p[0].1)
        .sum()
}

fn component_polygon(
    labels: &Array2<u32>,
    component: &ClassComponent,
    grid: &GridSpec,
) -> Option<Polygon<f64>> {
    let rings = trace_rings(&boundary_edges(labels, component.label, component.bbox));

    let (mut exteriors, holes): (Vec<_>, Vec<_>) =
        rings.into_iter().partition(|r| signed_area2(r) > 0);
    exteriors.sort_by_key(|r| std::cmp::Reverse(signed_area2(r)));
    let exterior = exteriors.into_iter().next()?;

    let to_map = |ring: &[Vertex]| -> LineString<f64> {
        ring.iter()
            .map(|&(c, r)| {
                let (x, y) = grid.corner(r as usize, c as usize);
                Coord { x, y }
            })
            .collect()
    };
    Some(Polygon::new(
        to_map(&exterior),
        holes.iter().map(|h| to_map(h)).collect(),
    ))
}

/// Douglas-Peucker simplification; rings that would collapse keep their
/// original shape.
fn simplify_polygon(polygon: &Polygon<f64>, tolerance: f64) -> Polygon<f64> {
    if tolerance <= 0.0 {
        return polygon.clone();
    }
    let keep = |ring: &LineString<f64>| -> LineString<f64> {
        let simplified = ring.simplify(&tolerance);
        if simplified.0.len() >= 4 {
            simplified
        } else {
            ring.clone()
        }
    };
    Polygon::new(
        keep(polygon.exterior()),
        polygon.interiors().iter().map(keep).collect(),
    )
}

fn to_feature(component: &ClassComponent, polygon: Polygon<f64>, grid: &GridSpec) -> Feature {
    let ring_coords = |ring: &LineString<f64>| -> Vec<[f64; 2]> {
        ring.coords().map(|c| [c.x, c.y]).collect()
    };
    let mut coordinates = vec![ring_coords(polygon.exterior())];
    coordinates.extend(polygon.interiors().iter().map(ring_coords));

    // Pixel area at the component's middle row.
    let mid_row = (component.bbox.0 + component.bbox.1) / 2;
    let area_ha = component.area as f64 * grid.pixel_area_m2(mid_row) / M2_PER_HECTARE;

    Feature {
        kind: "Feature".to_string(),
        geometry: PolygonGeometry {
            kind: "Polygon".to_string(),
            coordinates,
        },
        properties: FeatureProperties {
            class_id: component.class.id(),
            class_name: component.class.key().to_string(),
            class_label: component.class.label().to_string(),
            color: component.class.color().to_string(),
            area_ha,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn whole(labels: &Array2<u32>) -> (usize, usize, usize, usize) {
        let (h, w) = labels.dim();
        (0, h - 1, 0, w - 1)
    }

    const W: Option<ParcelClass> = Some(ParcelClass::SurfaceWater);
    const C: Option<ParcelClass> = Some(ParcelClass::HealthyCrop);

    #[test]
    fn diagonal_pixels_are_separate_components() {
        let classes = array![[W, C], [C, W]];
        let (_, components) = label_components(&classes);
        assert_eq!(components.len(), 4);
    }

    #[test]
    fn single_pixel_traces_unit_square() {
        let labels = array![[1u32]];
        let rings = trace_rings(&boundary_edges(&labels, 1, whole(&labels)));
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].len(), 5);
        assert_eq!(signed_area2(&rings[0]), 2);
    }

    #[test]
    fn ring_with_hole() {
        let labels = array![[1u32, 1, 1], [1, 0, 1], [1, 1, 1]];
        let rings = trace_rings(&boundary_edges(&labels, 1, whole(&labels)));
        let areas: Vec<i64> = rings.iter().map(|r| signed_area2(r)).collect();
        assert_eq!(rings.len(), 2);
        assert!(areas.contains(&18));
        assert!(areas.contains(&-2));
    }

    #[test]
    fn pinched_hole_is_split_off() {
        // The centre-left gap touches the outside only at a corner.
        let labels = array![
            [1u32, 1, 1],
            [1, 0, 1],
            [0, 1, 1],
        ];
        let rings = trace_rings(&boundary_edges(&labels, 1, whole(&labels)));
        let mut areas: Vec<i64> = rings.iter().map(|r| signed_area2(r)).collect();
        areas.sort_unstable();
        assert_eq!(areas, vec![-2, 16]);
        assert!(rings.iter().all(|r| r.first() == r.last()));
    }
}
