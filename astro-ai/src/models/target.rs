//! Celestial target with normalized J2000 coordinates

use crate::types::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};

/// Wrap right ascension into `[0, 360)`
pub fn normalize_ra(ra_deg: f64) -> f64 {
    let wrapped = ra_deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Clamp declination into `[-90, 90]`
pub fn clamp_dec(dec_deg: f64) -> f64 {
    dec_deg.clamp(-90.0, 90.0)
}

/// Resolved celestial target
///
/// Coordinates are normalized on construction and never change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// Catalog name, when the caller supplied one
    pub name: Option<String>,
    /// Right ascension in degrees, `[0, 360)`
    pub ra_deg: f64,
    /// Declination in degrees, `[-90, 90]`
    pub dec_deg: f64,
}

impl Target {
    /// Build a target from raw coordinates, normalizing them
    ///
    /// # Errors
    /// `InvalidInput` when either coordinate is NaN or infinite
    pub fn new(name: Option<String>, ra_deg: f64, dec_deg: f64) -> PipelineResult<Self> {
        if !ra_deg.is_finite() || !dec_deg.is_finite() {
            return Err(PipelineError::InvalidInput(format!(
                "Coordinates must be finite numbers (ra_deg={}, dec_deg={})",
                ra_deg, dec_deg
            )));
        }

        Ok(Self {
            name: name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            ra_deg: normalize_ra(ra_deg),
            dec_deg: clamp_dec(dec_deg),
        })
    }

    /// Display label: the name if known, else the coordinates
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("RA {:.4}°, Dec {:+.4}°", self.ra_deg, self.dec_deg),
        }
    }
}
