//! SkyView survey query client
//!
//! POSTs the position and survey to `runquery.pl` and streams the HTML
//! answer through a [`LinkScanner`], stopping at the first image or FITS
//! link. The service is slow, so the request carries the long survey
//! timeout rather than the download timeout.

use crate::clients::{ensure_success, LinkScanner};
use crate::config::PipelineConfig;
use crate::types::{PipelineError, PipelineResult};
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::debug;

/// SkyView client
pub struct SkyViewClient {
    http_client: Client,
    base_url: String,
    timeout: Duration,
    max_scan_bytes: usize,
    default_pixels: u32,
}

impl SkyViewClient {
    pub fn new(http_client: Client, config: &PipelineConfig) -> Self {
        Self {
            http_client,
            base_url: config.skyview_url.clone(),
            timeout: config.survey_timeout(),
            max_scan_bytes: config.max_scan_bytes,
            default_pixels: config.default_pixels,
        }
    }

    /// Form fields for one query
    ///
    /// Scale is arcseconds per pixel so the field spans `size_arcmin`.
    pub fn form_params(
        &self,
        ra_deg: f64,
        dec_deg: f64,
        survey: &str,
        size_arcmin: f64,
        pixels: Option<u32>,
    ) -> Vec<(&'static str, String)> {
        let pixels = pixels.unwrap_or(self.default_pixels).max(1);
        let scale = size_arcmin * 60.0 / pixels as f64;
        let scale = (scale * 10_000.0).round() / 10_000.0;

        vec![
            ("Position", format!("{},{}", ra_deg, dec_deg)),
            ("Survey", survey.to_string()),
            ("Pixels", pixels.to_string()),
            ("Scale", scale.to_string()),
            ("Coordinates", "J2000".to_string()),
        ]
    }

    /// Query the survey and return the first image link in the response
    ///
    /// # Errors
    /// - `Network` / `Timeout` for transport failures or non-2xx status
    /// - `UpstreamParse` when the body ends (or exceeds the scan ceiling)
    ///   without a recognizable link
    pub async fn find_image_url(
        &self,
        ra_deg: f64,
        dec_deg: f64,
        survey: &str,
        size_arcmin: f64,
        pixels: Option<u32>,
    ) -> PipelineResult<String> {
        let base = Url::parse(&self.base_url).map_err(|e| {
            PipelineError::Network(format!("Invalid SkyView URL {}: {}", self.base_url, e))
        })?;
        let params = self.form_params(ra_deg, dec_deg, survey, size_arcmin, pixels);
        debug!(survey = %survey, ra_deg, dec_deg, "Querying SkyView");

        let response = self
            .http_client
            .post(base.clone())
            .form(&params)
            .timeout(self.timeout)
            .send()
            .await?;
        let mut response = ensure_success(response, "SkyView")?;

        let mut scanner = LinkScanner::new(base, self.max_scan_bytes);
        while let Some(chunk) = response.chunk().await? {
            if let Some(url) = scanner.feed(&chunk)? {
                return Ok(url);
            }
        }

        Err(PipelineError::UpstreamParse(format!(
            "No image URL in SkyView response for survey={} at ({}, {}) after {} bytes",
            survey,
            ra_deg,
            dec_deg,
            scanner.total_bytes()
        )))
    }
}
