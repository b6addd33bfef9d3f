use ndarray::{Array2, Zip};

/// First finite value per pixel, taking layers in catalog order.
pub fn mosaic_composite(layers: &[&Array2<f32>]) -> Array2<f32> {
    let Some(first) = layers.first() else {
        return Array2::zeros((0, 0));
    };
    let mut result = (*first).clone();
    for layer in &layers[1..] {
        Zip::from(&mut result).and(*layer).for_each(|out, &v| {
            if !out.is_finite() {
                *out = v;
            }
        });
    }
    result
}
