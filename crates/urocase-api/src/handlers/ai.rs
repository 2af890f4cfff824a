//! Image explanation, refinement and follow-up chat.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use urocase_models::ChatRole;
use urocase_vision::ChatTurn;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeImageRequest {
    pub image_base64: String,
    #[serde(default)]
    pub attending_prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CaseDraftResponse {
    pub explanation: String,
    pub title: String,
    pub category: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefineRequest {
    pub image_base64: String,
    pub current_explanation: String,
    pub feedback: String,
}

#[derive(Deserialize)]
pub struct ChatHistoryEntry {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub explanation: String,
    #[serde(default)]
    pub chat_history: Vec<ChatHistoryEntry>,
    pub user_message: String,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub response: String,
}

async fn draft(state: &AppState, explanation: String) -> ApiResult<CaseDraftResponse> {
    let (title, category) = state.assistant.describe(&explanation).await?;
    Ok(CaseDraftResponse {
        explanation,
        title,
        category: category.to_string(),
    })
}

/// Explain a single CT image and suggest a title and category.
pub async fn analyze_image(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeImageRequest>,
) -> ApiResult<Json<CaseDraftResponse>> {
    let explanation = state
        .assistant
        .explain_image(&request.image_base64, request.attending_prompt.as_deref())
        .await?;
    Ok(Json(draft(&state, explanation).await?))
}

/// Rework an explanation from attending feedback.
pub async fn refine_explanation(
    State(state): State<AppState>,
    Json(request): Json<RefineRequest>,
) -> ApiResult<Json<CaseDraftResponse>> {
    if request.feedback.trim().is_empty() {
        return Err(ApiError::bad_request("Feedback is required"));
    }
    let explanation = state
        .assistant
        .refine(&request.image_base64, &request.current_explanation, &request.feedback)
        .await?;
    Ok(Json(draft(&state, explanation).await?))
}

/// Answer a follow-up question about a case explanation.
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    if request.user_message.trim().is_empty() {
        return Err(ApiError::bad_request("Message is required"));
    }
    let history: Vec<ChatTurn> = request
        .chat_history
        .into_iter()
        .map(|entry| ChatTurn {
            role: entry.role,
            content: entry.content,
        })
        .collect();

    let response = state
        .assistant
        .chat_reply(&request.explanation, &history, &request.user_message)
        .await?;
    Ok(Json(ChatResponse { response }))
}
