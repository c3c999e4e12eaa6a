//! Test Helper Utilities
//!
//! Shared utilities for testing astro-ai

#![allow(dead_code)]

pub mod stub_upstream;

// Re-export commonly used items
pub use stub_upstream::{blob_png, StubUpstream, M81_DEC, M81_RA, SLOW_SURVEY_DELAY};

use astro_ai::artifacts::FsArtifactStore;
use astro_ai::config::PipelineConfig;
use astro_ai::workflow::{PipelineEvent, PipelineOrchestrator};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc;

/// Orchestrator wired to the stub upstream, with artifacts in a fresh temp dir
pub fn stub_orchestrator(stub: &StubUpstream) -> (PipelineOrchestrator, TempDir) {
    orchestrator_with(stub.pipeline_config())
}

/// Orchestrator with an explicit pipeline config, artifacts in a fresh temp dir
pub fn orchestrator_with(config: PipelineConfig) -> (PipelineOrchestrator, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = Arc::new(FsArtifactStore::new(dir.path()));
    let orchestrator =
        PipelineOrchestrator::new(config, store).expect("Failed to build orchestrator");
    (orchestrator, dir)
}

/// Drain every event already sent on a closed channel
pub fn drain_events(rx: &mut mpsc::Receiver<PipelineEvent>) -> Vec<PipelineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
