//! Data models for astro-ai
//!
//! Requests, targets, responses and the per-request state machine.

pub mod pipeline_state;
pub mod request;
pub mod response;
pub mod target;

pub use pipeline_state::{PipelineRun, PipelineState, StateTransition};
pub use request::{
    AnalysisTask, AnalyzeRequest, ChatMessage, ChatRole, RequestOptions, TargetSpec, DEFAULT_BAND,
};
pub use response::{Artifact, ArtifactType, PipelineResponse, Provenance, ResponseStatus};
pub use target::{clamp_dec, normalize_ra, Target};
