//! SDSS ImgCutout URL builder
//!
//! The fast-path catalog needs no query round trip: the cutout URL is built
//! locally from the position and field size, then downloaded like any other
//! image. Parameters are clamped to the ranges the service accepts; positions
//! outside SDSS coverage still produce a URL (the download then fails).

use crate::models::target::{clamp_dec, normalize_ra};
use crate::types::{PipelineError, PipelineResult};
use reqwest::Url;
use tracing::debug;

pub const SCALE_MIN: f64 = 0.015;
pub const SCALE_MAX: f64 = 60.0;
pub const PIXELS_MIN: u32 = 64;
pub const PIXELS_MAX: u32 = 2048;
pub const DEFAULT_PIXELS: u32 = 300;

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Clamped cutout parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SdssCutout {
    /// Degrees, `[0, 360)`
    pub ra: f64,
    /// Degrees, `[-90, 90]`
    pub dec: f64,
    /// Arcseconds per pixel
    pub scale: f64,
    /// Width and height
    pub pixels: u32,
}

impl SdssCutout {
    /// Square cutout of `size_arcmin` on a side
    ///
    /// `pixels` defaults to 300; scale is `size_arcmin * 60 / pixels`.
    pub fn new(ra_deg: f64, dec_deg: f64, size_arcmin: f64, pixels: Option<u32>) -> Self {
        let pixels = pixels
            .unwrap_or(DEFAULT_PIXELS)
            .clamp(PIXELS_MIN, PIXELS_MAX);
        let scale = (size_arcmin * 60.0 / pixels as f64).clamp(SCALE_MIN, SCALE_MAX);

        Self {
            ra: round_to(normalize_ra(ra_deg), 6),
            dec: round_to(clamp_dec(dec_deg), 4),
            scale: round_to(scale, 4),
            pixels,
        }
    }

    /// `GET` URL against the cutout endpoint
    pub fn url(&self, base_url: &str) -> PipelineResult<String> {
        let pixels = self.pixels.to_string();
        let url = Url::parse_with_params(
            base_url,
            &[
                ("ra", self.ra.to_string()),
                ("dec", self.dec.to_string()),
                ("scale", self.scale.to_string()),
                ("width", pixels.clone()),
                ("height", pixels),
            ],
        )
        .map_err(|e| PipelineError::Network(format!("Invalid SDSS cutout URL {}: {}", base_url, e)))?;

        debug!(url = %url, "Built SDSS cutout URL");
        Ok(url.into())
    }
}
