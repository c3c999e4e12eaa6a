//! Analyze request model
//!
//! A request is either structured (task plus target or image reference) or
//! natural language (`message` / `messages`) that the language backend turns
//! into a structured one.

use crate::types::{PipelineError, PipelineResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Band reported in captions when the request does not name one
pub const DEFAULT_BAND: &str = "visible";

/// How far the pipeline runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisTask {
    /// Stop after segmentation
    Segment,
    /// Stop after measurement
    MeasureBasic,
    /// Run through the morphology summary and persist a report
    MorphologySummary,
    /// Only resolve and download the image
    #[serde(rename = "fetch_image")]
    FetchImageOnly,
}

impl AnalysisTask {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisTask::Segment => "segment",
            AnalysisTask::MeasureBasic => "measure_basic",
            AnalysisTask::MorphologySummary => "morphology_summary",
            AnalysisTask::FetchImageOnly => "fetch_image",
        }
    }

    /// Whether the measurement stage runs
    pub fn measures(&self) -> bool {
        matches!(
            self,
            AnalysisTask::MeasureBasic | AnalysisTask::MorphologySummary
        )
    }
}

/// Conversation role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// Single message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// Target as given by the caller: a name, or coordinates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ra_deg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dec_deg: Option<f64>,
}

impl TargetSpec {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }
}

/// Acquisition hints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestOptions {
    /// Explicit catalog or survey; disables fallback
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
    /// Wavelength band (visible, optical, infrared, ir, ultraviolet, uv)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band: Option<String>,
    /// Field side length in arcminutes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_arcmin: Option<f64>,
    /// Right ascension override (takes precedence over target coordinates)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ra_deg: Option<f64>,
    /// Declination override (takes precedence over target coordinates)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dec_deg: Option<f64>,
    /// Image side length in pixels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pixels: Option<u32>,
}

fn new_request_id() -> String {
    Uuid::new_v4().to_string()
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Request for galaxy analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    /// Identifier used for artifacts and logs
    #[serde(default = "new_request_id")]
    pub request_id: String,
    /// Single natural-language message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Conversation; takes precedence over `message`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<ChatMessage>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<AnalysisTask>,
    /// Image already available (URL or local path); skips acquisition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub options: RequestOptions,
}

impl AnalyzeRequest {
    /// Structured request with a fresh request id
    pub fn structured(target: TargetSpec, task: AnalysisTask, options: RequestOptions) -> Self {
        Self {
            request_id: new_request_id(),
            message: None,
            messages: None,
            target: Some(target),
            task: Some(task),
            image_url: None,
            options,
        }
    }

    /// Natural-language request with a fresh request id
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            request_id: new_request_id(),
            message: Some(message.into()),
            messages: None,
            target: None,
            task: None,
            image_url: None,
            options: RequestOptions::default(),
        }
    }

    /// Task plus something to analyze
    pub fn is_structured(&self) -> bool {
        self.task.is_some() && (self.target.is_some() || self.image_reference().is_some())
    }

    pub fn has_natural_language(&self) -> bool {
        non_blank(&self.message).is_some()
            || self.messages.as_ref().is_some_and(|m| !m.is_empty())
    }

    /// Reject requests that carry neither natural language nor structure
    pub fn validate(&self) -> PipelineResult<()> {
        if self.request_id.trim().is_empty() {
            return Err(PipelineError::InvalidInput(
                "request_id must not be empty".to_string(),
            ));
        }
        if !self.has_natural_language() && !self.is_structured() {
            return Err(PipelineError::InvalidInput(
                "Provide natural language (message or messages) or structured input (target and task)."
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Messages from `messages`, else `message` as a single user turn
    pub fn normalized_messages(&self) -> Vec<ChatMessage> {
        if let Some(messages) = self.messages.as_ref().filter(|m| !m.is_empty()) {
            return messages.clone();
        }
        match non_blank(&self.message) {
            Some(text) => vec![ChatMessage {
                role: ChatRole::User,
                content: text.to_string(),
            }],
            None => Vec::new(),
        }
    }

    /// Most recent user turn, for captions that answer what was asked
    pub fn last_user_message(&self) -> Option<String> {
        self.normalized_messages()
            .into_iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content)
    }

    /// Trimmed target name, if any
    pub fn target_name(&self) -> Option<&str> {
        self.target.as_ref().and_then(|t| non_blank(&t.name))
    }

    /// Trimmed image reference, if any
    pub fn image_reference(&self) -> Option<&str> {
        non_blank(&self.image_url)
    }

    /// Explicit coordinates; `options` take precedence over `target`
    ///
    /// # Errors
    /// `InvalidInput` when only one of RA/Dec is present
    pub fn explicit_coordinates(&self) -> PipelineResult<Option<(f64, f64)>> {
        let from_target = self
            .target
            .as_ref()
            .map(|t| (t.ra_deg, t.dec_deg))
            .unwrap_or((None, None));

        let pair = match (self.options.ra_deg, self.options.dec_deg) {
            (None, None) => from_target,
            given => given,
        };

        match pair {
            (Some(ra), Some(dec)) => Ok(Some((ra, dec))),
            (None, None) => Ok(None),
            _ => Err(PipelineError::InvalidInput(
                "ra_deg and dec_deg must be provided together".to_string(),
            )),
        }
    }

    /// Band reported to the caller; defaults to visible
    pub fn effective_band(&self) -> String {
        non_blank(&self.options.band)
            .unwrap_or(DEFAULT_BAND)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_wire_names() {
        let task: AnalysisTask = serde_json::from_value(json!("fetch_image")).unwrap();
        assert_eq!(task, AnalysisTask::FetchImageOnly);
        let task: AnalysisTask = serde_json::from_value(json!("measure_basic")).unwrap();
        assert_eq!(task, AnalysisTask::MeasureBasic);
        assert!(task.measures());
        assert!(!AnalysisTask::Segment.measures());
    }

    #[test]
    fn test_structured_request_deserializes_with_generated_id() {
        let request: AnalyzeRequest = serde_json::from_value(json!({
            "target": {"name": "M81"},
            "task": "segment",
            "options": {"catalog": "SDSS"}
        }))
        .unwrap();

        assert!(!request.request_id.is_empty());
        assert!(request.is_structured());
        assert!(request.validate().is_ok());
        assert_eq!(request.target_name(), Some("M81"));
        assert_eq!(request.options.catalog.as_deref(), Some("SDSS"));
    }

    #[test]
    fn test_empty_request_rejected() {
        let request: AnalyzeRequest = serde_json::from_value(json!({"message": "   "})).unwrap();
        assert!(matches!(
            request.validate(),
            Err(PipelineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_option_coordinates_take_precedence() {
        let mut request = AnalyzeRequest::structured(
            TargetSpec {
                name: None,
                ra_deg: Some(1.0),
                dec_deg: Some(2.0),
            },
            AnalysisTask::Segment,
            RequestOptions::default(),
        );
        assert_eq!(request.explicit_coordinates().unwrap(), Some((1.0, 2.0)));

        request.options.ra_deg = Some(10.0);
        request.options.dec_deg = Some(20.0);
        assert_eq!(request.explicit_coordinates().unwrap(), Some((10.0, 20.0)));

        request.options.dec_deg = None;
        assert!(request.explicit_coordinates().is_err());
    }

    #[test]
    fn test_last_user_message_prefers_conversation() {
        let request: AnalyzeRequest = serde_json::from_value(json!({
            "message": "ignored",
            "messages": [
                {"role": "user", "content": "show me M81"},
                {"role": "assistant", "content": "here it is"},
                {"role": "user", "content": "now in infrared"}
            ]
        }))
        .unwrap();

        assert_eq!(request.last_user_message().as_deref(), Some("now in infrared"));
        assert_eq!(request.effective_band(), DEFAULT_BAND);
    }
}
