//! Configuration resolution for astro-ai
//!
//! All timeouts, TLS verification and upstream endpoints live in one
//! [`PipelineConfig`] value that is handed to the orchestrator at construction.
//!
//! **Priority:** ENV → TOML → compiled default

use astro_common::config::{env_bool, env_parse, env_var, load_or_default};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Module name used for config file discovery (`astro-ai.toml`)
pub const MODULE_NAME: &str = "astro-ai";

/// CDS Sesame name resolver (plain-text output)
pub const DEFAULT_SESAME_URL: &str = "https://cds.unistra.fr/cgi-bin/nph-sesame";

/// SDSS DR18 ImgCutout JPEG endpoint
pub const DEFAULT_SDSS_CUTOUT_URL: &str =
    "https://skyserver.sdss.org/dr18/SkyServerWS/ImgCutout/getjpeg";

/// SkyView runquery endpoint
pub const DEFAULT_SKYVIEW_URL: &str = "https://skyview.gsfc.nasa.gov/current/cgi/runquery.pl";

/// Upstream services
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Name-resolution service URL
    pub sesame_url: String,
    /// Fast-path cutout URL
    pub sdss_cutout_url: String,
    /// Generic survey query URL
    pub skyview_url: String,
    /// Timeout for a name-resolution request
    pub name_resolution_timeout_secs: u64,
    /// Timeout for a single image download
    pub download_timeout_secs: u64,
    /// Ceiling for the survey query (the service is slow)
    pub survey_timeout_secs: u64,
    /// Verify upstream TLS certificates
    pub verify_tls: bool,
    /// Field size when the request does not give one
    pub default_size_arcmin: f64,
    /// Image side length in pixels when the request does not give one
    pub default_pixels: u32,
    /// Quantile of normalized intensity used as the segmentation threshold
    pub threshold_quantile: f64,
    /// Survey response bytes scanned before giving up on finding a link
    pub max_scan_bytes: usize,
    /// Largest image accepted from a download or local file
    pub max_download_bytes: usize,
    /// Directory that caller-supplied local image paths must resolve into;
    /// local paths are refused when unset
    pub local_image_root: Option<PathBuf>,
    /// User-Agent sent to upstream services
    pub user_agent: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sesame_url: DEFAULT_SESAME_URL.to_string(),
            sdss_cutout_url: DEFAULT_SDSS_CUTOUT_URL.to_string(),
            skyview_url: DEFAULT_SKYVIEW_URL.to_string(),
            name_resolution_timeout_secs: 60,
            download_timeout_secs: 30,
            survey_timeout_secs: 240,
            verify_tls: true,
            default_size_arcmin: 10.0,
            default_pixels: 300,
            threshold_quantile: 0.75,
            max_scan_bytes: 4 * 1024 * 1024,
            max_download_bytes: 64 * 1024 * 1024,
            local_image_root: None,
            user_agent: format!("astro-ai/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl PipelineConfig {
    pub fn name_resolution_timeout(&self) -> Duration {
        Duration::from_secs(self.name_resolution_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn survey_timeout(&self) -> Duration {
        Duration::from_secs(self.survey_timeout_secs)
    }

    fn apply_env(&mut self) {
        if let Some(v) = env_var("ASTRO_SESAME_URL") {
            self.sesame_url = v;
        }
        if let Some(v) = env_var("ASTRO_SDSS_CUTOUT_URL") {
            self.sdss_cutout_url = v;
        }
        if let Some(v) = env_var("ASTRO_SKYVIEW_URL") {
            self.skyview_url = v;
        }
        if let Some(v) = env_parse("ASTRO_SESAME_TIMEOUT") {
            self.name_resolution_timeout_secs = v;
        }
        if let Some(v) = env_parse("ASTRO_DOWNLOAD_TIMEOUT") {
            self.download_timeout_secs = v;
        }
        if let Some(v) = env_parse("ASTRO_SKYVIEW_TIMEOUT") {
            self.survey_timeout_secs = v;
        }
        if let Some(v) = env_bool("ASTRO_VERIFY_TLS") {
            self.verify_tls = v;
        }
        if let Some(v) = env_parse("ASTRO_MAX_DOWNLOAD_BYTES") {
            self.max_download_bytes = v;
        }
        if let Some(v) = env_var("ASTRO_LOCAL_IMAGE_ROOT") {
            self.local_image_root = Some(PathBuf::from(v));
        }
    }
}

/// Service configuration (HTTP surface, storage, logging, pipeline)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listen address
    pub bind_addr: String,
    /// Root of the per-request artifact directories
    pub artifact_dir: PathBuf,
    /// tracing filter directive (overridden by RUST_LOG)
    pub log_level: String,
    /// Key expected in the `X-API-Key` header
    pub api_key: Option<String>,
    /// Reject unauthenticated analyze/artifact requests
    pub require_api_key: bool,
    /// Upstream services and analysis parameters
    pub pipeline: PipelineConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5740".to_string(),
            artifact_dir: PathBuf::from("artifacts"),
            log_level: "info".to_string(),
            api_key: None,
            require_api_key: true,
            pipeline: PipelineConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Resolve configuration: TOML file (if any) with environment overrides on top
    pub fn resolve() -> Self {
        let mut config: ServiceConfig = load_or_default(MODULE_NAME);
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Some(v) = env_var("ASTRO_BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Some(v) = env_var("ASTRO_ARTIFACT_DIR") {
            self.artifact_dir = PathBuf::from(v);
        }
        if let Some(v) = env_var("ASTRO_LOG_LEVEL") {
            self.log_level = v;
        }
        if let Some(v) = env_var("ASTRO_API_KEY") {
            self.api_key = Some(v);
        }
        if let Some(v) = env_bool("ASTRO_REQUIRE_API_KEY") {
            self.require_api_key = v;
        }
        self.pipeline.apply_env();
    }
}
