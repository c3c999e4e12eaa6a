//! Sequential fallback acquisition
//!
//! Attempts run one at a time in plan order; the first downloaded image
//! wins and is stored before returning. Attempt-level failures are logged
//! and collected. Only invalid input and cancellation end the loop early.

use super::{
    is_fast_path_catalog, survey_for_band, AcquiredImage, AcquisitionAttempt, ResolvedImage,
    FAST_PATH_CATALOG,
};
use crate::artifacts::{ArtifactKind, ArtifactStore};
use crate::clients::{ImageDownloader, SdssCutout, SkyViewClient};
use crate::config::PipelineConfig;
use crate::models::Target;
use crate::types::{AttemptFailure, PipelineError, PipelineResult};
use reqwest::Client;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Geometry shared by every attempt of one request
#[derive(Debug, Clone, Copy)]
pub struct FieldOfView {
    pub size_arcmin: f64,
    pub pixels: Option<u32>,
}

/// Executes an attempt plan
pub struct ImageAcquirer {
    sdss_cutout_url: String,
    skyview: SkyViewClient,
    downloader: ImageDownloader,
    store: Arc<dyn ArtifactStore>,
}

impl ImageAcquirer {
    pub fn new(http_client: Client, config: &PipelineConfig, store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            sdss_cutout_url: config.sdss_cutout_url.clone(),
            skyview: SkyViewClient::new(http_client.clone(), config),
            downloader: ImageDownloader::new(http_client, config),
            store,
        }
    }

    /// Try each attempt in order until one yields image bytes
    ///
    /// # Errors
    /// - `InvalidInput` for an unmapped band (immediately, not recorded)
    /// - `Cancelled` when `cancel` fires
    /// - `AcquisitionExhausted` with every failure, in order, when all attempts fail
    /// - `Artifact` when the downloaded image cannot be stored
    pub async fn acquire(
        &self,
        request_id: &str,
        target: &Target,
        attempts: &[AcquisitionAttempt],
        fov: FieldOfView,
        cancel: &CancellationToken,
    ) -> PipelineResult<AcquiredImage> {
        let mut failures: Vec<AttemptFailure> = Vec::new();

        for (index, attempt) in attempts.iter().enumerate() {
            let label = attempt.label();
            debug!(request_id = %request_id, attempt = %label, index, "Starting acquisition attempt");

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(PipelineError::Cancelled),
                result = self.try_attempt(target, attempt, fov) => result,
            };

            match outcome {
                Ok((survey, image_url, bytes)) => {
                    let artifact = self.store.save(request_id, ArtifactKind::Image, &bytes).await?;
                    info!(
                        request_id = %request_id,
                        attempt = %label,
                        survey = %survey,
                        bytes = bytes.len(),
                        "Image acquired"
                    );

                    return Ok(AcquiredImage {
                        resolved: ResolvedImage::new(target, survey, image_url, fov.size_arcmin),
                        bytes,
                        artifact,
                        failed_attempts: failures.iter().map(|f| f.to_string()).collect(),
                    });
                }
                Err(e @ (PipelineError::InvalidInput(_) | PipelineError::Cancelled)) => return Err(e),
                Err(e) => {
                    warn!(request_id = %request_id, attempt = %label, error = %e, "Acquisition attempt failed");
                    failures.push(AttemptFailure {
                        label,
                        message: e.to_string(),
                    });
                }
            }
        }

        Err(PipelineError::AcquisitionExhausted { failures })
    }

    /// Resolve the image URL for one attempt and download it
    async fn try_attempt(
        &self,
        target: &Target,
        attempt: &AcquisitionAttempt,
        fov: FieldOfView,
    ) -> PipelineResult<(String, String, Vec<u8>)> {
        let survey = match attempt {
            AcquisitionAttempt::Catalog(catalog) => catalog.trim().to_string(),
            AcquisitionAttempt::Band(band) => survey_for_band(band)?.to_string(),
        };

        let image_url = if is_fast_path_catalog(&survey) {
            SdssCutout::new(target.ra_deg, target.dec_deg, fov.size_arcmin, fov.pixels)
                .url(&self.sdss_cutout_url)?
        } else {
            self.skyview
                .find_image_url(target.ra_deg, target.dec_deg, &survey, fov.size_arcmin, fov.pixels)
                .await?
        };

        let bytes = self.downloader.download(&image_url).await?;
        let survey = if is_fast_path_catalog(&survey) {
            FAST_PATH_CATALOG.to_string()
        } else {
            survey
        };
        Ok((survey, image_url, bytes))
    }
}
