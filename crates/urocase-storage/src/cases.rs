//! Case and chat transcript persistence.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::info;
use urocase_models::{Case, CaseId, CaseUpdate, ChatMessage, NewCase, NewChatMessage};
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

/// Storage seam for teaching cases and their chat messages.
#[async_trait]
pub trait CaseRepository: Send + Sync {
    /// All cases, highest case number first.
    async fn list_cases(&self) -> StorageResult<Vec<Case>>;

    async fn get_case(&self, id: &CaseId) -> StorageResult<Option<Case>>;

    /// Insert with the next case number (`max + 1`, starting at 1).
    async fn create_case(&self, case: NewCase) -> StorageResult<Case>;

    /// Apply the fields present in `update`. `None` when the case is missing.
    async fn update_case(&self, id: &CaseId, update: CaseUpdate) -> StorageResult<Option<Case>>;

    /// Remove a case and its messages, closing the gap in case numbers.
    /// Returns the removed case so callers can release its assets.
    async fn delete_case(&self, id: &CaseId) -> StorageResult<Option<Case>>;

    /// Messages of one case, oldest first.
    async fn list_messages(&self, case_id: &CaseId) -> StorageResult<Vec<ChatMessage>>;

    async fn create_message(
        &self,
        case_id: &CaseId,
        message: NewChatMessage,
    ) -> StorageResult<ChatMessage>;
}

#[derive(Debug, Default)]
struct Tables {
    cases: Vec<Case>,
    messages: Vec<ChatMessage>,
}

/// Process-local repository.
#[derive(Debug, Default)]
pub struct InMemoryCaseRepository {
    tables: RwLock<Tables>,
}

impl InMemoryCaseRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CaseRepository for InMemoryCaseRepository {
    async fn list_cases(&self) -> StorageResult<Vec<Case>> {
        let mut cases = self.tables.read().await.cases.clone();
        cases.sort_by(|a, b| b.case_number.cmp(&a.case_number));
        Ok(cases)
    }

    async fn get_case(&self, id: &CaseId) -> StorageResult<Option<Case>> {
        Ok(self.tables.read().await.cases.iter().find(|c| &c.id == id).cloned())
    }

    async fn create_case(&self, case: NewCase) -> StorageResult<Case> {
        let mut tables = self.tables.write().await;
        let case_number = tables.cases.iter().map(|c| c.case_number).max().unwrap_or(0) + 1;

        let case = Case {
            id: CaseId::new(),
            case_number,
            title: case.title,
            image_url: case.image_url,
            explanation: case.explanation,
            category: case.category,
            attending_prompt: case.attending_prompt,
            video_url: case.video_url,
            media_type: case.media_type,
            created_at: Utc::now(),
        };
        tables.cases.push(case.clone());

        info!(case_id = %case.id, case_number, "Created case");
        Ok(case)
    }

    async fn update_case(&self, id: &CaseId, update: CaseUpdate) -> StorageResult<Option<Case>> {
        let mut tables = self.tables.write().await;
        let Some(case) = tables.cases.iter_mut().find(|c| &c.id == id) else {
            return Ok(None);
        };

        if let Some(title) = update.title {
            case.title = title;
        }
        if let Some(explanation) = update.explanation {
            case.explanation = explanation;
        }
        if let Some(category) = update.category {
            case.category = category;
        }
        Ok(Some(case.clone()))
    }

    async fn delete_case(&self, id: &CaseId) -> StorageResult<Option<Case>> {
        let mut tables = self.tables.write().await;
        let Some(pos) = tables.cases.iter().position(|c| &c.id == id) else {
            return Ok(None);
        };

        let removed = tables.cases.remove(pos);
        tables.messages.retain(|m| &m.case_id != id);
        for case in tables.cases.iter_mut() {
            if case.case_number > removed.case_number {
                case.case_number -= 1;
            }
        }

        info!(case_id = %removed.id, case_number = removed.case_number, "Deleted case");
        Ok(Some(removed))
    }

    async fn list_messages(&self, case_id: &CaseId) -> StorageResult<Vec<ChatMessage>> {
        let tables = self.tables.read().await;
        let mut messages: Vec<ChatMessage> = tables
            .messages
            .iter()
            .filter(|m| &m.case_id == case_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps.
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }

    async fn create_message(
        &self,
        case_id: &CaseId,
        message: NewChatMessage,
    ) -> StorageResult<ChatMessage> {
        let mut tables = self.tables.write().await;
        if !tables.cases.iter().any(|c| &c.id == case_id) {
            return Err(StorageError::CaseNotFound(case_id.to_string()));
        }

        let message = ChatMessage {
            id: Uuid::new_v4().to_string(),
            case_id: case_id.clone(),
            role: message.role,
            content: message.content,
            created_at: Utc::now(),
        };
        tables.messages.push(message.clone());
        Ok(message)
    }
}
