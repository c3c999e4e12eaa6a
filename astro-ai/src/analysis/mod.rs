//! Deterministic image analysis: segment → measure → summarize
//!
//! Everything here is pure and CPU-bound; the orchestrator runs it on the
//! blocking pool.

pub mod image_loader;
pub mod measure;
pub mod segment;
pub mod summary;
pub mod synthetic;

pub use image_loader::decode_luma;
pub use measure::{measure, Measurements};
pub use segment::{segment, SegmentationResult};
pub use summary::{build_report, summarize};

use crate::types::PipelineResult;
use ndarray::Array2;

/// Analysis parameters for one orchestrator
#[derive(Debug, Clone, Copy)]
pub struct AnalysisPipeline {
    threshold_quantile: f64,
}

impl AnalysisPipeline {
    pub fn new(threshold_quantile: f64) -> Self {
        Self { threshold_quantile }
    }

    pub fn segment(&self, image: &Array2<f64>) -> PipelineResult<SegmentationResult> {
        segment(image, self.threshold_quantile)
    }

    pub fn measure(&self, image: &Array2<f64>, mask: &Array2<u8>) -> PipelineResult<Measurements> {
        measure(image, mask)
    }

    pub fn summarize(&self, measurements: &Measurements) -> String {
        summarize(measurements)
    }
}
