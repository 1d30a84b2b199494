//! Tutor API endpoints.
//!
//! Handlers only extract the body and shape the response; all decisions live
//! in [`crate::services::TutorGateway`]. Availability is checked before the
//! body is unwrapped, so a missing model or store answers 503 even for a
//! body that fails extraction.

use crate::dtos::{
    AnalyzeAudioRequest, AnalyzeTextRequest, ChatRequest, ChatResponse, SaveConversationRequest,
    SaveConversationResponse,
};
use crate::models::{AnalysisResult, PronunciationResult};
use crate::startup::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use service_core::error::AppError;

pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    state.gateway.ensure_model()?;
    let Json(request) = payload?;
    let message = state.gateway.chat(request).await?;
    Ok(Json(ChatResponse { message }))
}

pub async fn analyze_text(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeTextRequest>, JsonRejection>,
) -> Result<Json<AnalysisResult>, AppError> {
    state.gateway.ensure_model()?;
    let Json(request) = payload?;
    let result = state.gateway.analyze_text(request).await?;
    Ok(Json(result))
}

pub async fn analyze_audio(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeAudioRequest>, JsonRejection>,
) -> Result<Json<PronunciationResult>, AppError> {
    state.gateway.ensure_model()?;
    let Json(request) = payload?;
    let result = state.gateway.analyze_audio(request).await?;
    Ok(Json(result))
}

pub async fn save_conversation(
    State(state): State<AppState>,
    payload: Result<Json<SaveConversationRequest>, JsonRejection>,
) -> Result<Json<SaveConversationResponse>, AppError> {
    state.gateway.ensure_store()?;
    let Json(request) = payload?;
    let id = state.gateway.save_conversation(request).await?;

    Ok(Json(SaveConversationResponse {
        message: "Conversation saved successfully".to_string(),
        id,
    }))
}
