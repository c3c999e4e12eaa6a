//! Core Types and Trait Definitions for astro-ai
//!
//! Defines the pipeline error taxonomy and the trait seams between the
//! orchestrator and its network-facing collaborators.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for pipeline stages
pub type PipelineResult<T> = Result<T, PipelineError>;

/// One failed acquisition attempt, kept for the aggregated error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptFailure {
    /// Catalog or band that was tried ("default" when neither applies)
    pub label: String,
    /// Why the attempt failed
    pub message: String,
}

impl std::fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.label, self.message)
    }
}

fn join_failures(failures: &[AttemptFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Pipeline error
///
/// Attempt-level variants (`Network`, `Timeout`, `UpstreamParse`) are caught and
/// recorded by the acquirer; everything that reaches the orchestrator ends the
/// request with an error-status response.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Bad or missing target, unmapped band, malformed request (caller error)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Name could not be resolved to coordinates
    #[error("Not found: {0}")]
    NotFound(String),

    /// Transport-level failure or non-success HTTP status
    #[error("Network error: {0}")]
    Network(String),

    /// Network call exceeded its timeout
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Every acquisition attempt failed
    #[error("Failed to acquire image after {} attempt(s): {}", .failures.len(), join_failures(.failures))]
    AcquisitionExhausted {
        /// Per-attempt failures, in attempt order
        failures: Vec<AttemptFailure>,
    },

    /// Image and mask dimensions differ (internal invariant violation)
    #[error("Shape mismatch: image is {image:?}, mask is {mask:?}")]
    ShapeMismatch {
        /// Image dimensions (rows, cols)
        image: (usize, usize),
        /// Mask dimensions (rows, cols)
        mask: (usize, usize),
    },

    /// Survey response did not contain a recognizable image link
    #[error("Upstream parse error: {0}")]
    UpstreamParse(String),

    /// Downloaded bytes could not be decoded as an image
    #[error("Image decode error: {0}")]
    ImageDecode(String),

    /// Artifact store failure
    #[error("Artifact error: {0}")]
    Artifact(String),

    /// Calling context cancelled the run
    #[error("Pipeline cancelled")]
    Cancelled,

    /// Worker task died (panic in a blocking analysis stage)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Stable machine-readable code used in error responses
    pub fn error_code(&self) -> &'static str {
        match self {
            PipelineError::InvalidInput(_) => "INVALID_INPUT",
            PipelineError::NotFound(_) => "NOT_FOUND",
            PipelineError::Network(_) => "NETWORK_ERROR",
            PipelineError::Timeout(_) => "TIMEOUT",
            PipelineError::AcquisitionExhausted { .. } => "ACQUISITION_EXHAUSTED",
            PipelineError::ShapeMismatch { .. } => "SHAPE_MISMATCH",
            PipelineError::UpstreamParse(_) => "UPSTREAM_PARSE_ERROR",
            PipelineError::ImageDecode(_) => "IMAGE_DECODE_ERROR",
            PipelineError::Artifact(_) => "ARTIFACT_ERROR",
            PipelineError::Cancelled => "CANCELLED",
            PipelineError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Short, caller-facing message for the response summary
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::InvalidInput(msg) => format!("Request rejected: {}", msg),
            PipelineError::NotFound(_) => {
                "Could not resolve the target name. Check the spelling or provide ra_deg/dec_deg."
                    .to_string()
            }
            PipelineError::Network(_) | PipelineError::Timeout(_) => {
                "An upstream astronomy service is unreachable. Try again later.".to_string()
            }
            PipelineError::AcquisitionExhausted { failures } => format!(
                "No image could be fetched after {} attempt(s). Try another band or catalog.",
                failures.len()
            ),
            PipelineError::UpstreamParse(_) => {
                "The survey service returned no image for this position. Try another band."
                    .to_string()
            }
            PipelineError::ImageDecode(_) => {
                "The image could not be decoded for analysis. Use task fetch_image or another catalog."
                    .to_string()
            }
            PipelineError::ShapeMismatch { .. }
            | PipelineError::Artifact(_)
            | PipelineError::Internal(_) => {
                "Analysis failed due to an internal error.".to_string()
            }
            PipelineError::Cancelled => "Request was cancelled.".to_string(),
        }
    }

    /// True for failures that indicate a bug rather than bad input or upstream trouble
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            PipelineError::ShapeMismatch { .. } | PipelineError::Artifact(_) | PipelineError::Internal(_)
        )
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PipelineError::Timeout(err.to_string())
        } else {
            PipelineError::Network(err.to_string())
        }
    }
}

/// Resolves a catalog name to J2000 equatorial coordinates
///
/// # Example
/// ```rust,ignore
/// let (ra, dec) = resolver.resolve("M81").await?;
/// ```
#[async_trait::async_trait]
pub trait NameResolver: Send + Sync {
    /// Service name for logging and provenance
    fn name(&self) -> &'static str;

    /// Resolve `name` to `(ra_deg, dec_deg)`; one network round trip, no retries
    async fn resolve(&self, name: &str) -> PipelineResult<(f64, f64)>;
}
