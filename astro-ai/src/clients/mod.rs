//! Upstream service clients
//!
//! - Sesame: catalog name → coordinates (plain text)
//! - SDSS ImgCutout: direct cutout URL, built locally
//! - SkyView: survey query, HTML scanned for an image link
//! - Downloader: fetches the resolved image bytes
//!
//! All clients share one `reqwest::Client`; timeouts are set per request so
//! each kind of call keeps its own bound.

pub mod downloader;
pub mod link_scanner;
pub mod sdss_client;
pub mod sesame_client;
pub mod skyview_client;

pub use downloader::{is_remote_reference, ImageDownloader};
pub use link_scanner::LinkScanner;
pub use sdss_client::SdssCutout;
pub use sesame_client::SesameClient;
pub use skyview_client::SkyViewClient;

use crate::config::PipelineConfig;
use crate::types::{PipelineError, PipelineResult};
use reqwest::{header, Client, Response};

/// Build the shared HTTP client from configuration
pub fn build_http_client(config: &PipelineConfig) -> PipelineResult<Client> {
    let user_agent = header::HeaderValue::from_str(&config.user_agent).map_err(|e| {
        PipelineError::InvalidInput(format!("Invalid user_agent {:?}: {}", config.user_agent, e))
    })?;

    let mut headers = header::HeaderMap::new();
    headers.insert(header::USER_AGENT, user_agent);

    Client::builder()
        .default_headers(headers)
        .danger_accept_invalid_certs(!config.verify_tls)
        .build()
        .map_err(|e| PipelineError::Network(format!("Failed to create HTTP client: {}", e)))
}

/// Turn a non-2xx response into a `Network` error naming the service
pub(crate) fn ensure_success(response: Response, service: &str) -> PipelineResult<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(PipelineError::Network(format!(
            "{} returned HTTP {} for {}",
            service,
            status,
            response.url()
        )))
    }
}
