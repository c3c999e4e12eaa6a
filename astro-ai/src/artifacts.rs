//! Per-request artifact storage
//!
//! Every request owns one directory under the artifact root, named by its
//! request id. Directories are created on first write; each file is written
//! once and never overwritten.

use crate::models::{Artifact, ArtifactType};
use crate::types::{PipelineError, PipelineResult};
use async_trait::async_trait;
use ndarray::Array2;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// FITS primary header starts with this card
const FITS_MAGIC: &[u8] = b"SIMPLE  =";

/// What is being stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Image,
    Mask,
    Measurements,
    Report,
}

impl ArtifactKind {
    pub fn artifact_type(&self) -> ArtifactType {
        match self {
            ArtifactKind::Image => ArtifactType::Image,
            ArtifactKind::Mask => ArtifactType::Mask,
            ArtifactKind::Measurements => ArtifactType::Measurements,
            ArtifactKind::Report => ArtifactType::Report,
        }
    }

    /// File stem inside the request directory
    fn stem(&self) -> &'static str {
        match self {
            ArtifactKind::Image => "image",
            ArtifactKind::Mask => "mask",
            ArtifactKind::Measurements => "measurements",
            ArtifactKind::Report => "report",
        }
    }

    /// Extension for `bytes` (images are sniffed, the rest are fixed)
    fn extension(&self, bytes: &[u8]) -> &'static str {
        match self {
            ArtifactKind::Image => image_extension(bytes),
            ArtifactKind::Mask => "png",
            ArtifactKind::Measurements => "json",
            ArtifactKind::Report => "txt",
        }
    }
}

/// File extension for downloaded image bytes; `bin` when unrecognized
pub fn image_extension(bytes: &[u8]) -> &'static str {
    if is_fits(bytes) {
        return "fits";
    }
    infer::get(bytes).map(|t| t.extension()).unwrap_or("bin")
}

/// MIME type for stored image bytes
pub fn image_mime_type(bytes: &[u8]) -> &'static str {
    if is_fits(bytes) {
        return "application/fits";
    }
    infer::get(bytes)
        .map(|t| t.mime_type())
        .unwrap_or("application/octet-stream")
}

pub fn is_fits(bytes: &[u8]) -> bool {
    bytes.starts_with(FITS_MAGIC)
}

/// Reject ids that would escape the artifact root
pub fn validate_request_id(request_id: &str) -> PipelineResult<()> {
    let invalid = request_id.is_empty()
        || request_id == "."
        || request_id.contains("..")
        || request_id.contains('/')
        || request_id.contains('\\')
        || request_id.contains('\0');

    if invalid {
        return Err(PipelineError::InvalidInput(format!(
            "request_id {:?} is not usable as an artifact namespace",
            request_id
        )));
    }
    Ok(())
}

/// Encode a binary mask as an 8-bit grayscale PNG (255 where set)
pub fn encode_mask_png(mask: &Array2<u8>) -> PipelineResult<Vec<u8>> {
    use image::{ImageBuffer, ImageFormat, Luma};

    let (height, width) = mask.dim();
    let mut buffer: ImageBuffer<Luma<u8>, Vec<u8>> = ImageBuffer::new(width as u32, height as u32);
    for (x, y, pixel) in buffer.enumerate_pixels_mut() {
        let value = if mask[[y as usize, x as usize]] > 0 { 255u8 } else { 0u8 };
        *pixel = Luma([value]);
    }

    let mut png = Cursor::new(Vec::new());
    buffer
        .write_to(&mut png, ImageFormat::Png)
        .map_err(|e| PipelineError::Artifact(format!("Failed to encode mask PNG: {}", e)))?;
    Ok(png.into_inner())
}

/// Blob store keyed by request id
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist `bytes`; the returned path is stable for this request id and kind
    async fn save(
        &self,
        request_id: &str,
        kind: ArtifactKind,
        bytes: &[u8],
    ) -> PipelineResult<Artifact>;

    /// Stored bytes, if this request has an artifact of this kind
    async fn load(&self, request_id: &str, kind: ArtifactKind) -> PipelineResult<Option<Vec<u8>>>;

    /// Whether anything was already stored under this request id
    async fn contains(&self, request_id: &str) -> PipelineResult<bool>;
}

/// Filesystem store: `<base>/<request_id>/<kind>.<ext>`
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    base_dir: PathBuf,
}

impl FsArtifactStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn request_dir(&self, request_id: &str) -> PipelineResult<PathBuf> {
        validate_request_id(request_id)?;
        Ok(self.base_dir.join(request_id))
    }

    async fn find(&self, dir: &Path, kind: ArtifactKind) -> PipelineResult<Option<PathBuf>> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(dir, e)),
        };

        let prefix = format!("{}.", kind.stem());
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(dir, e))? {
            if entry.file_name().to_string_lossy().starts_with(&prefix) {
                return Ok(Some(entry.path()));
            }
        }
        Ok(None)
    }
}

/// Artifacts are write-once, so a reused request id is a caller error
pub fn already_used(request_id: &str) -> PipelineError {
    PipelineError::InvalidInput(format!(
        "request_id {:?} already used; submit a new one",
        request_id
    ))
}

fn io_error(path: &Path, e: std::io::Error) -> PipelineError {
    PipelineError::Artifact(format!("{}: {}", path.display(), e))
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn save(
        &self,
        request_id: &str,
        kind: ArtifactKind,
        bytes: &[u8],
    ) -> PipelineResult<Artifact> {
        let dir = self.request_dir(request_id)?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error(&dir, e))?;

        let path = dir.join(format!("{}.{}", kind.stem(), kind.extension(bytes)));
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => already_used(request_id),
                _ => io_error(&path, e),
            })?;
        file.write_all(bytes).await.map_err(|e| io_error(&path, e))?;
        file.flush().await.map_err(|e| io_error(&path, e))?;

        debug!(request_id = %request_id, path = %path.display(), bytes = bytes.len(), "Artifact saved");
        Ok(Artifact::new(kind.artifact_type(), path.to_string_lossy()))
    }

    async fn load(&self, request_id: &str, kind: ArtifactKind) -> PipelineResult<Option<Vec<u8>>> {
        let dir = self.request_dir(request_id)?;
        match self.find(&dir, kind).await? {
            Some(path) => tokio::fs::read(&path)
                .await
                .map(Some)
                .map_err(|e| io_error(&path, e)),
            None => Ok(None),
        }
    }

    async fn contains(&self, request_id: &str) -> PipelineResult<bool> {
        let dir = self.request_dir(request_id)?;
        tokio::fs::try_exists(&dir)
            .await
            .map_err(|e| io_error(&dir, e))
    }
}
