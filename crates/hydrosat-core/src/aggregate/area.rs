use ndarray::Array2;

use crate::classify::{ClassMap, ParcelClass};
use crate::consts::M2_PER_HECTARE;

/// Hectares per class over the valid in-region pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassAreas {
    /// Indexed by class id.
    pub hectares: [f64; 5],
    pub total_ha: f64,
    /// Sampling stride; 1 when every pixel was visited.
    pub stride: usize,
    pub approximate: bool,
}

impl ClassAreas {
    pub fn of(&self, class: ParcelClass) -> f64 {
        self.hectares[class.id() as usize]
    }

    /// Share of the valid area, in percent. Zero when nothing is valid.
    pub fn percent(&self, class: ParcelClass) -> f64 {
        if self.total_ha > 0.0 {
            self.of(class) / self.total_ha * 100.0
        } else {
            0.0
        }
    }
}

/// Sampling stride that keeps `pixel_count` within `max_pixels`.
pub fn sampling_stride(pixel_count: u64, max_pixels: u64) -> usize {
    if max_pixels == 0 || pixel_count <= max_pixels {
        return 1;
    }
    let ratio = pixel_count as f64 / max_pixels as f64;
    ratio.sqrt().ceil().max(1.0) as usize
}

/// Sum pixel areas per class inside `inside`.
///
/// When more than `max_pixels` pixels lie inside the region, only every
/// `stride`-th row and column is visited and each sample stands for the
/// `stride × stride` block it starts (clipped at the last row and column);
/// the result is then flagged approximate.
pub fn class_areas(map: &ClassMap, inside: &Array2<bool>, max_pixels: u64) -> ClassAreas {
    let in_region = inside.iter().filter(|&&v| v).count() as u64;
    let stride = sampling_stride(in_region, max_pixels);

    let (rows, cols) = map.classes.dim();
    let mut hectares = [0.0f64; 5];
    for row in (0..rows).step_by(stride) {
        let row_span = stride.min(rows - row);
        let pixel_ha = map.grid.pixel_area_m2(row) / M2_PER_HECTARE;
        for col in (0..cols).step_by(stride) {
            if !inside[[row, col]] {
                continue;
            }
            if let Some(class) = map.classes[[row, col]] {
                let col_span = stride.min(cols - col);
                hectares[class.id() as usize] += pixel_ha * (row_span * col_span) as f64;
            }
        }
    }

    ClassAreas {
        hectares,
        total_ha: hectares.iter().sum(),
        stride,
        approximate: stride > 1,
    }
}
