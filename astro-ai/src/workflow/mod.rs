//! Per-request workflow engine
//!
//! Runs the resolve → acquire → analyze pipeline for one request and reports
//! progress as [`PipelineEvent`]s over a bounded channel.
//!
//! # Event order
//! - `status` before every stage that runs
//! - on success: `summary`, then `artifacts` (when any were stored), then `end`
//! - on failure: exactly one `error`
//!
//! Exactly one of `end` or `error` terminates a stream.

pub mod orchestrator;

pub use orchestrator::PipelineOrchestrator;

use crate::models::{PipelineResponse, PipelineState};
use serde::{Deserialize, Serialize};

/// Progress event for one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A stage is about to run
    Status {
        message: String,
        state: PipelineState,
    },

    /// Final summary text
    Summary { summary: String },

    /// Artifacts are stored and can be fetched
    #[serde(rename = "artifacts")]
    ArtifactsReady { request_id: String },

    /// Final response (success)
    End(PipelineResponse),

    /// Terminal failure
    Error {
        request_id: String,
        error_code: String,
        /// Short actionable text
        message: String,
        /// Underlying cause
        detail: String,
    },
}

impl PipelineEvent {
    /// Wire tag, used as the SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            PipelineEvent::Status { .. } => "status",
            PipelineEvent::Summary { .. } => "summary",
            PipelineEvent::ArtifactsReady { .. } => "artifacts",
            PipelineEvent::End(_) => "end",
            PipelineEvent::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineEvent::End(_) | PipelineEvent::Error { .. })
    }
}
