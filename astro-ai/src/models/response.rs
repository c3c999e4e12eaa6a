//! Pipeline response envelope
//!
//! The response is always well-formed: failures produce an `error`-status
//! response rather than leaving the caller without one.

use crate::types::PipelineError;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// Terminal status of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Kind of persisted artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactType {
    Image,
    Mask,
    Measurements,
    Report,
}

/// Reference to a persisted artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(rename = "type")]
    pub artifact_type: ArtifactType,
    pub path: String,
}

impl Artifact {
    pub fn new(artifact_type: ArtifactType, path: impl Into<String>) -> Self {
        Self {
            artifact_type,
            path: path.into(),
        }
    }
}

/// When and by what the response was produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// RFC 3339 UTC timestamp, second precision
    pub timestamp: String,
    pub versions: BTreeMap<String, String>,
}

impl Provenance {
    pub fn now() -> Self {
        let mut versions = BTreeMap::new();
        versions.insert("astro-ai".to_string(), env!("CARGO_PKG_VERSION").to_string());
        versions.insert(
            "astro-common".to_string(),
            astro_common::VERSION.to_string(),
        );

        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            versions,
        }
    }
}

/// Final response for one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResponse {
    pub request_id: String,
    pub status: ResponseStatus,
    pub summary: String,
    #[serde(default)]
    pub results: Map<String, Value>,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    pub provenance: Provenance,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl PipelineResponse {
    pub fn success(
        request_id: impl Into<String>,
        summary: impl Into<String>,
        results: Map<String, Value>,
        artifacts: Vec<Artifact>,
        warnings: Vec<String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            status: ResponseStatus::Success,
            summary: summary.into(),
            results,
            artifacts,
            provenance: Provenance::now(),
            warnings,
        }
    }

    /// Error envelope: actionable summary, code and detail in `results`, no artifacts
    pub fn failure(request_id: impl Into<String>, error: &PipelineError) -> Self {
        let mut results = Map::new();
        results.insert("error_code".to_string(), json!(error.error_code()));
        results.insert("detail".to_string(), json!(error.to_string()));
        if let PipelineError::AcquisitionExhausted { failures } = error {
            results.insert("attempts".to_string(), json!(failures));
        }

        Self {
            request_id: request_id.into(),
            status: ResponseStatus::Error,
            summary: error.user_message(),
            results,
            artifacts: Vec::new(),
            provenance: Provenance::now(),
            warnings: vec!["Check logs for details.".to_string()],
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    /// Artifacts of one type
    pub fn artifacts_of(&self, artifact_type: ArtifactType) -> impl Iterator<Item = &Artifact> {
        self.artifacts
            .iter()
            .filter(move |a| a.artifact_type == artifact_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttemptFailure;

    #[test]
    fn test_failure_envelope_is_well_formed() {
        let error = PipelineError::AcquisitionExhausted {
            failures: vec![AttemptFailure {
                label: "SDSS".to_string(),
                message: "HTTP 404 Not Found".to_string(),
            }],
        };
        let response = PipelineResponse::failure("req-1", &error);

        assert_eq!(response.status, ResponseStatus::Error);
        assert!(response.artifacts.is_empty());
        assert_eq!(response.results["error_code"], "ACQUISITION_EXHAUSTED");
        assert_eq!(response.results["attempts"][0]["label"], "SDSS");
        assert!(!response.summary.is_empty());
    }

    #[test]
    fn test_wire_shape() {
        let response = PipelineResponse::success(
            "req-2",
            "done",
            Map::new(),
            vec![Artifact::new(ArtifactType::Mask, "artifacts/req-2/mask.png")],
            Vec::new(),
        );
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["status"], "success");
        assert_eq!(value["artifacts"][0]["type"], "mask");
        assert!(value["provenance"]["timestamp"].as_str().unwrap().ends_with('Z'));
        assert_eq!(value["provenance"]["versions"]["astro-ai"], env!("CARGO_PKG_VERSION"));
    }
}
