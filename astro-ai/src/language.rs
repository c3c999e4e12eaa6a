//! Natural-language collaborator
//!
//! The pipeline never parses free text itself. A [`LanguageBackend`] turns a
//! conversation into a structured intent (or declines it) and phrases the
//! captions shown next to results. [`TemplateBackend`] is the built-in
//! implementation used when no text-completion service is wired in.

use crate::models::{AnalysisTask, ChatMessage, RequestOptions, TargetSpec};
use crate::types::PipelineResult;
use async_trait::async_trait;

/// What the conversation asks for
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Analyze {
        target: TargetSpec,
        task: AnalysisTask,
        options: RequestOptions,
    },
    /// Out of scope; the message is returned to the caller as the summary
    Decline { message: String },
}

#[async_trait]
pub trait LanguageBackend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    async fn extract_intent(&self, messages: &[ChatMessage]) -> PipelineResult<Intent>;

    /// Caption for a fetched image
    async fn image_caption(
        &self,
        target_name: &str,
        band: &str,
        user_message: Option<&str>,
    ) -> PipelineResult<String>;

    /// Summary accompanying a morphology report
    async fn accompanying_summary(
        &self,
        target_name: &str,
        band: &str,
        morphology: &str,
        user_message: Option<&str>,
    ) -> PipelineResult<String>;
}

pub const DECLINE_MESSAGE: &str = "I can only analyze galaxy images from a structured request. \
     Provide target.name (or ra_deg/dec_deg) and a task: fetch_image, segment, measure_basic or morphology_summary.";

/// Fixed-template backend; never calls out
#[derive(Debug, Clone, Default)]
pub struct TemplateBackend;

#[async_trait]
impl LanguageBackend for TemplateBackend {
    fn name(&self) -> &'static str {
        "template"
    }

    async fn extract_intent(&self, _messages: &[ChatMessage]) -> PipelineResult<Intent> {
        Ok(Intent::Decline {
            message: DECLINE_MESSAGE.to_string(),
        })
    }

    async fn image_caption(
        &self,
        target_name: &str,
        band: &str,
        _user_message: Option<&str>,
    ) -> PipelineResult<String> {
        Ok(format!("Here is the image of {} in the {} band.", target_name, band))
    }

    async fn accompanying_summary(
        &self,
        _target_name: &str,
        _band: &str,
        morphology: &str,
        _user_message: Option<&str>,
    ) -> PipelineResult<String> {
        Ok(morphology.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChatRole;

    #[tokio::test]
    async fn test_template_declines_free_text() {
        let messages = vec![ChatMessage {
            role: ChatRole::User,
            content: "show me something pretty".to_string(),
        }];
        let intent = TemplateBackend.extract_intent(&messages).await.unwrap();
        assert!(matches!(intent, Intent::Decline { .. }));
    }

    #[tokio::test]
    async fn test_template_texts() {
        let caption = TemplateBackend.image_caption("M81", "visible", None).await.unwrap();
        assert_eq!(caption, "Here is the image of M81 in the visible band.");

        let summary = TemplateBackend
            .accompanying_summary("M81", "visible", "Detected galaxy-like structure.", Some("hi"))
            .await
            .unwrap();
        assert_eq!(summary, "Detected galaxy-like structure.");
    }
}
