//! Image download and local image loading
//!
//! Downloads stream into memory up to `max_download_bytes`. Caller-supplied
//! local paths are accepted only inside `local_image_root`.

use crate::clients::ensure_success;
use crate::config::PipelineConfig;
use crate::types::{PipelineError, PipelineResult};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// True for `http://` and `https://` references
pub fn is_remote_reference(reference: &str) -> bool {
    let lower = reference.trim().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Downloads image bytes with a bounded timeout and size
pub struct ImageDownloader {
    http_client: Client,
    timeout: Duration,
    max_bytes: usize,
    local_root: Option<PathBuf>,
}

impl ImageDownloader {
    pub fn new(http_client: Client, config: &PipelineConfig) -> Self {
        Self {
            http_client,
            timeout: config.download_timeout(),
            max_bytes: config.max_download_bytes,
            local_root: config.local_image_root.clone(),
        }
    }

    /// GET `url`; non-2xx, empty and oversized bodies fail
    pub async fn download(&self, url: &str) -> PipelineResult<Vec<u8>> {
        debug!(url = %url, "Downloading image");

        let response = self
            .http_client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await?;
        let mut response = ensure_success(response, "Image host")?;

        if let Some(length) = response.content_length() {
            if length > self.max_bytes as u64 {
                return Err(self.too_large(url));
            }
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if bytes.len() + chunk.len() > self.max_bytes {
                return Err(self.too_large(url));
            }
            bytes.extend_from_slice(&chunk);
        }

        if bytes.is_empty() {
            return Err(PipelineError::Network(format!("Empty response body from {}", url)));
        }

        debug!(url = %url, bytes = bytes.len(), "Download complete");
        Ok(bytes)
    }

    fn too_large(&self, url: &str) -> PipelineError {
        PipelineError::Network(format!(
            "Image from {} exceeds {} bytes",
            url, self.max_bytes
        ))
    }

    /// Load a caller-supplied image: `http(s)://` URL, `file://` URL or plain path
    ///
    /// # Errors
    /// `InvalidInput` for local paths when no local root is configured, for
    /// paths resolving outside it, and for missing, empty or oversized files
    pub async fn load(&self, reference: &str) -> PipelineResult<Vec<u8>> {
        let reference = reference.trim();
        if is_remote_reference(reference) {
            return self.download(reference).await;
        }

        let path = reference.strip_prefix("file://").unwrap_or(reference);
        self.read_local(Path::new(path)).await
    }

    async fn read_local(&self, path: &Path) -> PipelineResult<Vec<u8>> {
        let root = self.local_root.as_ref().ok_or_else(|| {
            PipelineError::InvalidInput(
                "Local image paths are not accepted; supply an http(s) image_url".to_string(),
            )
        })?;
        let root = tokio::fs::canonicalize(root).await.map_err(|e| {
            warn!(root = %root.display(), error = %e, "Configured local image root is unusable");
            PipelineError::Internal(format!("local_image_root {}: {}", root.display(), e))
        })?;

        let resolved = match tokio::fs::canonicalize(path).await {
            Ok(resolved) => resolved,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PipelineError::InvalidInput(format!(
                    "Image file not found: {}",
                    path.display()
                )))
            }
            Err(e) => {
                return Err(PipelineError::InvalidInput(format!(
                    "Cannot read image file {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        if !resolved.starts_with(&root) {
            return Err(PipelineError::InvalidInput(format!(
                "Image path {} is outside the allowed image directory",
                path.display()
            )));
        }

        let bytes = tokio::fs::read(&resolved).await.map_err(|e| {
            PipelineError::InvalidInput(format!("Cannot read image file {}: {}", path.display(), e))
        })?;
        if bytes.is_empty() {
            return Err(PipelineError::InvalidInput(format!(
                "Image file is empty: {}",
                path.display()
            )));
        }
        if bytes.len() > self.max_bytes {
            return Err(PipelineError::InvalidInput(format!(
                "Image file {} exceeds {} bytes",
                path.display(),
                self.max_bytes
            )));
        }
        Ok(bytes)
    }
}
