//! Teaching case and chat message handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::{info, warn};
use urocase_models::{Case, CaseId, CaseUpdate, ChatMessage, NewCase, NewChatMessage};
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

async fn require_case(state: &AppState, id: &CaseId) -> ApiResult<Case> {
    state
        .cases
        .get_case(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Case not found"))
}

pub async fn list_cases(State(state): State<AppState>) -> ApiResult<Json<Vec<Case>>> {
    Ok(Json(state.cases.list_cases().await?))
}

pub async fn get_case(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Case>> {
    Ok(Json(require_case(&state, &CaseId::from(id)).await?))
}

pub async fn create_case(
    State(state): State<AppState>,
    Json(request): Json<NewCase>,
) -> ApiResult<(StatusCode, Json<Case>)> {
    request.validate()?;
    let case = state.cases.create_case(request).await?;
    Ok((StatusCode::CREATED, Json(case)))
}

/// Partial update; an empty body returns the case unchanged.
pub async fn update_case(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<CaseUpdate>,
) -> ApiResult<Json<Case>> {
    let id = CaseId::from(id);
    if update.is_empty() {
        return Ok(Json(require_case(&state, &id).await?));
    }

    state
        .cases
        .update_case(&id, update)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Case not found"))
}

/// Delete a case, its chat messages and its stored video.
pub async fn delete_case(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let id = CaseId::from(id);
    let removed = state
        .cases
        .delete_case(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Case not found"))?;

    if let Some(key) = removed.video_url.as_deref() {
        // The case is already gone; an orphaned object is only a storage cost
        match state.objects.delete(key).await {
            Ok(()) => info!(case_id = %id, key = %key, "Deleted case video"),
            Err(e) => warn!(case_id = %id, key = %key, "Failed to delete case video: {}", e),
        }
    }

    Ok(Json(DeleteResponse { success: true }))
}

pub async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<ChatMessage>>> {
    let id = CaseId::from(id);
    require_case(&state, &id).await?;
    Ok(Json(state.cases.list_messages(&id).await?))
}

pub async fn create_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<NewChatMessage>,
) -> ApiResult<(StatusCode, Json<ChatMessage>)> {
    request.validate()?;
    let message = state.cases.create_message(&CaseId::from(id), request).await?;
    Ok((StatusCode::CREATED, Json(message)))
}
