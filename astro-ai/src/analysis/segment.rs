//! Quantile-threshold segmentation

use crate::types::{PipelineError, PipelineResult};
use ndarray::Array2;
use serde_json::{json, Value};

pub const ALGORITHM_ID: &str = "quantile_threshold";

/// Guards the min-max denominator on flat images
const NORMALIZE_EPSILON: f64 = 1e-9;

/// Binary mask plus how it was produced
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationResult {
    /// 1 where the pixel is part of the structure; same shape as the image
    pub mask: Array2<u8>,
    pub threshold: f64,
    pub pixel_count: usize,
    pub algorithm_id: &'static str,
}

impl SegmentationResult {
    /// Entry for `results.segmentation`
    pub fn metadata(&self) -> Value {
        json!({
            "threshold": self.threshold,
            "mask_pixels": self.pixel_count,
            "algorithm": self.algorithm_id,
        })
    }
}

/// Min-max normalize into `[0, 1)`
pub fn normalize(image: &Array2<f64>) -> Array2<f64> {
    let min = image.iter().copied().fold(f64::INFINITY, f64::min);
    let max = image.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let denom = (max - min) + NORMALIZE_EPSILON;
    image.mapv(|v| (v - min) / denom)
}

/// Quantile with linear interpolation between closest ranks
///
/// Matches numpy's default method: position `(n - 1) * q` in sorted order.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let position = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Segment pixels at or above the `q` quantile of normalized intensity
pub fn segment(image: &Array2<f64>, q: f64) -> PipelineResult<SegmentationResult> {
    let normalized = normalize(image);
    let values: Vec<f64> = normalized.iter().copied().collect();
    let threshold = quantile(&values, q)
        .ok_or_else(|| PipelineError::InvalidInput("Cannot segment an empty image".to_string()))?;

    let mask = normalized.mapv(|v| u8::from(v >= threshold));
    let pixel_count = mask.iter().filter(|&&m| m > 0).count();

    Ok(SegmentationResult {
        mask,
        threshold,
        pixel_count,
        algorithm_id: ALGORITHM_ID,
    })
}
