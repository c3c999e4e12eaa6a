//! Pipeline state machine
//!
//! START → RESOLVING_TARGET → ACQUIRING_IMAGE → SEGMENTING → MEASURING →
//! SUMMARIZING → COMPLETED, with FAILED reachable from any non-terminal state.
//! Stages may be skipped, never revisited.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    Start,
    /// Name → coordinates
    ResolvingTarget,
    /// Attempt plan → downloaded image
    AcquiringImage,
    Segmenting,
    Measuring,
    /// Morphology text and report
    Summarizing,
    Completed,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Completed | PipelineState::Failed)
    }

    /// Progress message emitted when the stage begins
    pub fn status_message(&self) -> Option<&'static str> {
        match self {
            PipelineState::ResolvingTarget => Some("Resolving target name…"),
            PipelineState::AcquiringImage => Some("Fetching image from catalog…"),
            PipelineState::Segmenting => Some("Segmenting image…"),
            PipelineState::Measuring => Some("Computing measurements…"),
            PipelineState::Summarizing => Some("Generating summary…"),
            _ => None,
        }
    }
}

/// Recorded transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: PipelineState,
    pub to: PipelineState,
    pub at: DateTime<Utc>,
}

/// Per-request state tracker
#[derive(Debug, Clone)]
pub struct PipelineRun {
    state: PipelineState,
    transitions: Vec<StateTransition>,
}

impl Default for PipelineRun {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineRun {
    pub fn new() -> Self {
        Self {
            state: PipelineState::Start,
            transitions: Vec::new(),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    /// Move forward to `next`
    ///
    /// Returns `false` (and stays put) for backward moves or moves out of a
    /// terminal state; `Failed` is accepted from any non-terminal state.
    pub fn advance(&mut self, next: PipelineState) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        if next != PipelineState::Failed && next <= self.state {
            return false;
        }

        self.transitions.push(StateTransition {
            from: self.state,
            to: next,
            at: Utc::now(),
        });
        self.state = next;
        true
    }

    /// Visited states in order, starting with `Start`
    pub fn path(&self) -> Vec<PipelineState> {
        std::iter::once(PipelineState::Start)
            .chain(self.transitions.iter().map(|t| t.to))
            .collect()
    }
}
