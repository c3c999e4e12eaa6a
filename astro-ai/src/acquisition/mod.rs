//! Image acquisition
//!
//! [`planner`] turns catalog/band hints into an ordered attempt list;
//! [`acquirer`] walks that list against the fast-path catalog and the
//! survey service until one attempt yields downloadable image bytes.

pub mod acquirer;
pub mod planner;

pub use acquirer::{FieldOfView, ImageAcquirer};
pub use planner::plan_attempts;

use crate::models::{Artifact, Target};
use crate::types::{PipelineError, PipelineResult};
use serde::Serialize;

/// Catalog served by the local URL builder instead of a survey query
pub const FAST_PATH_CATALOG: &str = "SDSS";

/// Band → survey
pub const BAND_TO_SURVEY: &[(&str, &str)] = &[
    ("visible", "DSS"),
    ("optical", "DSS"),
    ("infrared", "2MASS-J"),
    ("ir", "2MASS-J"),
    ("ultraviolet", "GALEX"),
    ("uv", "GALEX"),
];

/// Survey for a band (case-insensitive)
///
/// # Errors
/// `InvalidInput` naming the accepted bands
pub fn survey_for_band(band: &str) -> PipelineResult<&'static str> {
    let key = band.trim().to_ascii_lowercase();
    BAND_TO_SURVEY
        .iter()
        .find(|(b, _)| *b == key)
        .map(|(_, survey)| *survey)
        .ok_or_else(|| {
            let known: Vec<&str> = BAND_TO_SURVEY.iter().map(|(b, _)| *b).collect();
            PipelineError::InvalidInput(format!(
                "Unknown band '{}'. Use one of: {}",
                band.trim(),
                known.join(", ")
            ))
        })
}

pub fn is_fast_path_catalog(catalog: &str) -> bool {
    catalog.trim().eq_ignore_ascii_case(FAST_PATH_CATALOG)
}

/// One source to try
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionAttempt {
    /// Catalog or survey name, used as-is
    Catalog(String),
    /// Wavelength band, mapped through [`BAND_TO_SURVEY`]
    Band(String),
}

impl AcquisitionAttempt {
    /// Label used in failure records and warnings
    pub fn label(&self) -> String {
        let value = match self {
            AcquisitionAttempt::Catalog(c) => c.trim(),
            AcquisitionAttempt::Band(b) => b.trim(),
        };
        if value.is_empty() {
            "default".to_string()
        } else {
            value.to_string()
        }
    }

    pub fn catalog(&self) -> Option<&str> {
        match self {
            AcquisitionAttempt::Catalog(c) => Some(c),
            AcquisitionAttempt::Band(_) => None,
        }
    }

    pub fn band(&self) -> Option<&str> {
        match self {
            AcquisitionAttempt::Band(b) => Some(b),
            AcquisitionAttempt::Catalog(_) => None,
        }
    }
}

/// Successful acquisition, reported in `results.resolved_image`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedImage {
    pub ra_deg: f64,
    pub dec_deg: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub survey_used: String,
    pub image_url: String,
    pub size_arcmin: f64,
}

impl ResolvedImage {
    pub fn new(target: &Target, survey_used: impl Into<String>, image_url: String, size_arcmin: f64) -> Self {
        Self {
            ra_deg: target.ra_deg,
            dec_deg: target.dec_deg,
            name: target.name.clone(),
            survey_used: survey_used.into(),
            image_url,
            size_arcmin,
        }
    }
}

/// Downloaded image plus what it took to get it
#[derive(Debug, Clone)]
pub struct AcquiredImage {
    pub resolved: ResolvedImage,
    pub bytes: Vec<u8>,
    /// Stored copy of `bytes`
    pub artifact: Artifact,
    /// Failures of attempts tried before the successful one, as `label: message`
    pub failed_attempts: Vec<String>,
}
