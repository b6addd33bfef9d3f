use ndarray::Array2;
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;

/// Per-pixel median over the finite values of a layer stack.
///
/// Masked (NaN) samples are skipped; a pixel with no finite sample stays NaN.
/// Uses `select_nth_unstable` for O(n) median without full sort and
/// parallelizes at the row level for large grids.
pub fn median_composite(layers: &[&Array2<f32>]) -> Array2<f32> {
    let Some(first) = layers.first() else {
        return Array2::zeros((0, 0));
    };
    let (h, w) = first.dim();
    let n = layers.len();

    let median_row = |row: usize| -> Vec<f32> {
        let mut pixel_values = Vec::with_capacity(n);
        (0..w)
            .map(|col| {
                pixel_values.clear();
                pixel_values.extend(
                    layers
                        .iter()
                        .map(|layer| layer[[row, col]])
                        .filter(|v| v.is_finite()),
                );
                compute_median(&mut pixel_values)
            })
            .collect()
    };

    let flat: Vec<f32> = if h * w >= PARALLEL_PIXEL_THRESHOLD && n > 1 {
        (0..h).into_par_iter().flat_map_iter(median_row).collect()
    } else {
        (0..h).flat_map(median_row).collect()
    };
    Array2::from_shape_vec((h, w), flat).unwrap_or_else(|_| Array2::from_elem((h, w), f32::NAN))
}

fn compute_median(pixel_values: &mut [f32]) -> f32 {
    let n = pixel_values.len();
    if n == 0 {
        f32::NAN
    } else if n == 1 {
        pixel_values[0]
    } else if n % 2 == 1 {
        let mid = n / 2;
        *pixel_values
            .select_nth_unstable_by(mid, |a, b| a.total_cmp(b))
            .1
    } else {
        let mid = n / 2;
        pixel_values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
        pixel_values[..mid].select_nth_unstable_by(mid - 1, |a, b| a.total_cmp(b));
        (pixel_values[mid - 1] + pixel_values[mid]) / 2.0
    }
}
