//! Teaching cases and chat transcripts.

use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Unique identifier for a teaching case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct CaseId(pub String);

impl CaseId {
    /// Generate a new random case ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CaseId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CaseId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CaseId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Kind of media a case was authored from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Image,
    Video,
}

/// Closed list of case categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
pub enum CaseCategory {
    Stones,
    Hydronephrosis,
    #[serde(rename = "Mass/Tumor")]
    MassTumor,
    Infection,
    Trauma,
    Congenital,
    Vascular,
    Bladder,
    Prostate,
    #[default]
    Other,
}

impl CaseCategory {
    pub const ALL: [CaseCategory; 10] = [
        CaseCategory::Stones,
        CaseCategory::Hydronephrosis,
        CaseCategory::MassTumor,
        CaseCategory::Infection,
        CaseCategory::Trauma,
        CaseCategory::Congenital,
        CaseCategory::Vascular,
        CaseCategory::Bladder,
        CaseCategory::Prostate,
        CaseCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CaseCategory::Stones => "Stones",
            CaseCategory::Hydronephrosis => "Hydronephrosis",
            CaseCategory::MassTumor => "Mass/Tumor",
            CaseCategory::Infection => "Infection",
            CaseCategory::Trauma => "Trauma",
            CaseCategory::Congenital => "Congenital",
            CaseCategory::Vascular => "Vascular",
            CaseCategory::Bladder => "Bladder",
            CaseCategory::Prostate => "Prostate",
            CaseCategory::Other => "Other",
        }
    }

    /// Parse model output. Anything that is not exactly a category name is `Other`.
    pub fn parse_lenient(value: &str) -> Self {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == value)
            .unwrap_or(CaseCategory::Other)
    }
}

impl fmt::Display for CaseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted teaching case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub id: CaseId,
    /// Dense 1-based display number, renumbered on delete
    pub case_number: u32,
    pub title: String,
    /// Image data URL or thumbnail for video cases
    pub image_url: String,
    pub explanation: String,
    pub category: String,
    pub attending_prompt: Option<String>,
    /// Object key of the stored, transcoded video
    pub video_url: Option<String>,
    pub media_type: MediaType,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a case.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewCase {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1))]
    pub image_url: String,
    #[validate(length(min = 1))]
    pub explanation: String,
    #[validate(length(min = 1, max = 64))]
    pub category: String,
    #[serde(default)]
    pub attending_prompt: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub media_type: MediaType,
}

/// Partial update of a case.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CaseUpdate {
    pub title: Option<String>,
    pub explanation: Option<String>,
    pub category: Option<String>,
}

impl CaseUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.explanation.is_none() && self.category.is_none()
    }
}

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    #[serde(alias = "assistant", alias = "model")]
    Ai,
}

/// A persisted follow-up chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub case_id: CaseId,
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Payload for appending a chat message.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewChatMessage {
    pub role: ChatRole,
    #[validate(length(min = 1))]
    pub content: String,
}
