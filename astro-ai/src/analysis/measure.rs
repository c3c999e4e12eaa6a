//! Basic shape measurements over a mask

use crate::types::{PipelineError, PipelineResult};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Added to both spreads so a single row or column never divides by zero
const SPREAD_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurements {
    pub area_pixels: f64,
    /// Mean column of the masked pixels
    pub centroid_x: f64,
    /// Mean row of the masked pixels
    pub centroid_y: f64,
    /// `1 - minor/major` of the per-axis population standard deviations
    pub ellipticity: f64,
    /// Mean of the raw image over the mask
    pub mean_intensity: f64,
}

/// Measure the masked region of `image`
///
/// An empty mask yields all zeros.
///
/// # Errors
/// `ShapeMismatch` when the mask and image dimensions differ
pub fn measure(image: &Array2<f64>, mask: &Array2<u8>) -> PipelineResult<Measurements> {
    if image.dim() != mask.dim() {
        return Err(PipelineError::ShapeMismatch {
            image: image.dim(),
            mask: mask.dim(),
        });
    }

    let mut count = 0usize;
    let (mut sum_x, mut sum_y, mut sum_i) = (0.0, 0.0, 0.0);
    for ((row, col), &m) in mask.indexed_iter() {
        if m > 0 {
            count += 1;
            sum_x += col as f64;
            sum_y += row as f64;
            sum_i += image[[row, col]];
        }
    }

    if count == 0 {
        return Ok(Measurements::default());
    }

    let n = count as f64;
    let centroid_x = sum_x / n;
    let centroid_y = sum_y / n;

    let (mut var_x, mut var_y) = (0.0, 0.0);
    for ((row, col), &m) in mask.indexed_iter() {
        if m > 0 {
            var_x += (col as f64 - centroid_x).powi(2);
            var_y += (row as f64 - centroid_y).powi(2);
        }
    }
    let std_x = (var_x / n).sqrt() + SPREAD_EPSILON;
    let std_y = (var_y / n).sqrt() + SPREAD_EPSILON;

    Ok(Measurements {
        area_pixels: n,
        centroid_x,
        centroid_y,
        ellipticity: 1.0 - std_x.min(std_y) / std_x.max(std_y),
        mean_intensity: sum_i / n,
    })
}
