//! Case authoring: image explanations, titles, categories, chat and refinement.

use std::sync::Arc;

use tracing::{debug, info};
use urocase_models::CaseCategory;
use urocase_vision::{ChatTurn, InlineImage, VisionBackend};

use crate::error::{AnalysisError, AnalyzeResult};
use crate::prompts;

pub const UNTITLED_CASE: &str = "Untitled Case";
pub const CHAT_FALLBACK_REPLY: &str = "I'm sorry, I couldn't generate a response. Please try again.";

/// Model-backed helpers for building and discussing teaching cases.
#[derive(Clone)]
pub struct TeachingAssistant {
    backend: Arc<dyn VisionBackend>,
}

impl TeachingAssistant {
    pub fn new(backend: Arc<dyn VisionBackend>) -> Self {
        Self { backend }
    }

    /// Teaching explanation for one CT image given as a data URL or bare base64.
    pub async fn explain_image(
        &self,
        image: &str,
        attending: Option<&str>,
    ) -> AnalyzeResult<String> {
        let image = parse_image(image)?;
        let prompt = prompts::image_explanation(attending);
        let explanation = self.backend.analyze_images(&prompt, &[image]).await?;
        info!(chars = explanation.len(), "Generated image explanation");
        Ok(explanation)
    }

    /// Short case title; `"Untitled Case"` when the model returns nothing.
    pub async fn title_for(&self, explanation: &str) -> AnalyzeResult<String> {
        let turns = [ChatTurn::user(prompts::explanation_turn(explanation))];
        let title = self.backend.converse(prompts::TITLE_PROMPT, &turns).await?;
        let title = title.trim().trim_matches('"').trim();
        Ok(if title.is_empty() {
            UNTITLED_CASE.to_string()
        } else {
            title.to_string()
        })
    }

    /// One category from the closed list; anything else becomes `Other`.
    pub async fn category_for(&self, explanation: &str) -> AnalyzeResult<CaseCategory> {
        let turns = [ChatTurn::user(prompts::explanation_turn(explanation))];
        let raw = self.backend.converse(prompts::CATEGORY_PROMPT, &turns).await?;
        let category = CaseCategory::parse_lenient(&raw);
        debug!(raw = %raw.trim(), category = %category.as_str(), "Categorized case");
        Ok(category)
    }

    /// Title and category, generated concurrently.
    pub async fn describe(&self, explanation: &str) -> AnalyzeResult<(String, CaseCategory)> {
        tokio::try_join!(self.title_for(explanation), self.category_for(explanation))
    }

    /// Answer a follow-up question about a case.
    pub async fn chat_reply(
        &self,
        explanation: &str,
        history: &[ChatTurn],
        message: &str,
    ) -> AnalyzeResult<String> {
        let mut turns = history.to_vec();
        turns.push(ChatTurn::user(message));

        let reply = self
            .backend
            .converse(&prompts::chat_system(explanation), &turns)
            .await?;
        Ok(if reply.trim().is_empty() {
            CHAT_FALLBACK_REPLY.to_string()
        } else {
            reply
        })
    }

    /// Rework an explanation from attending feedback; keeps the current text
    /// when the model returns nothing.
    pub async fn refine(
        &self,
        image: &str,
        current: &str,
        feedback: &str,
    ) -> AnalyzeResult<String> {
        let image = parse_image(image)?;
        let prompt = prompts::refine(current, feedback);
        let refined = self.backend.analyze_images(&prompt, &[image]).await?;
        Ok(if refined.trim().is_empty() {
            current.to_string()
        } else {
            refined
        })
    }
}

fn parse_image(image: &str) -> AnalyzeResult<InlineImage> {
    let image = image.trim();
    if image.is_empty() {
        return Err(AnalysisError::InvalidImage("image is empty".to_string()));
    }
    Ok(InlineImage::from_data_url(image))
}

#[cfg(test)]
mod tests {
    use super::*;
    use urocase_models::ChatRole;

    use crate::test_support::{StubBackend, EXPLANATION};

    fn assistant(backend: Arc<StubBackend>) -> TeachingAssistant {
        TeachingAssistant::new(backend)
    }

    #[tokio::test]
    async fn test_explain_image_sends_one_image() {
        let backend = Arc::new(StubBackend::default());
        let text = assistant(backend.clone())
            .explain_image("data:image/png;base64,AAAA", Some("Point out the ureter"))
            .await
            .unwrap();

        assert_eq!(text, EXPLANATION);
        assert_eq!(backend.last_image_count(), Some(1));
        let prompt = backend.last_prompt().unwrap();
        assert!(prompt.starts_with(prompts::IMAGE_EXPLANATION_PROMPT));
        assert!(prompt.ends_with("Additional guidance from the attending: Point out the ureter"));
    }

    #[tokio::test]
    async fn test_empty_image_rejected() {
        let backend = Arc::new(StubBackend::default());
        let err = assistant(backend.clone()).explain_image("  ", None).await.unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidImage(_)));
        assert_eq!(backend.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_title_trimmed_and_defaulted() {
        let quoted = assistant(Arc::new(StubBackend::replying(
            "  \"Staghorn Calculus Left Kidney\"\n",
        )));
        assert_eq!(quoted.title_for("x").await.unwrap(), "Staghorn Calculus Left Kidney");

        let empty = assistant(Arc::new(StubBackend::replying("   ")));
        assert_eq!(empty.title_for("x").await.unwrap(), UNTITLED_CASE);
    }

    #[tokio::test]
    async fn test_category_parsing() {
        let known = assistant(Arc::new(StubBackend::replying("Mass/Tumor\n")));
        assert_eq!(known.category_for("x").await.unwrap(), CaseCategory::MassTumor);

        let unknown = assistant(Arc::new(StubBackend::replying("Renal cyst")));
        assert_eq!(unknown.category_for("x").await.unwrap(), CaseCategory::Other);
    }

    #[tokio::test]
    async fn test_describe_runs_both() {
        let backend = Arc::new(StubBackend::replying("Stones"));
        let (title, category) = assistant(backend.clone()).describe("x").await.unwrap();
        assert_eq!(title, "Stones");
        assert_eq!(category, CaseCategory::Stones);
        assert_eq!(backend.chat_calls(), 2);
    }

    #[tokio::test]
    async fn test_chat_reply_appends_message() {
        let backend = Arc::new(StubBackend::replying("It is 9 mm."));
        let history = vec![ChatTurn::user("Where is the stone?"), ChatTurn::model("Left UPJ.")];
        let reply = assistant(backend.clone())
            .chat_reply("Case text", &history, "How big is it?")
            .await
            .unwrap();
        assert_eq!(reply, "It is 9 mm.");

        let turns = backend.last_turns().unwrap();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[2].role, ChatRole::User);
        assert_eq!(turns[2].content, "How big is it?");
        assert!(backend.last_prompt().unwrap().ends_with("Case Explanation:\nCase text"));
    }

    #[tokio::test]
    async fn test_chat_reply_fallback_text() {
        let reply = assistant(Arc::new(StubBackend::replying("")))
            .chat_reply("Case", &[], "?")
            .await
            .unwrap();
        assert_eq!(reply, CHAT_FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn test_refine_keeps_current_when_empty() {
        let refined = assistant(Arc::new(StubBackend::replying("")))
            .refine("data:image/jpeg;base64,AAAA", "Current text", "Shorter please")
            .await
            .unwrap();
        assert_eq!(refined, "Current text");
    }
}
