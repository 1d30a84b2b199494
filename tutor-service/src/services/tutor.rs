//! The tutor gateway: prompt construction, model calls, completion
//! validation and conversation persistence.
//!
//! Both collaborators are optional. A missing model or store turns the
//! operations that need it into [`TutorError::ServiceUnavailable`] instead of
//! preventing startup.

use super::database::ConversationStore;
use super::metrics;
use super::prompts::{pronunciation_instruction, writing_feedback_prompt, Language};
use super::providers::{
    Completion, CompletionRequest, GenerativeModel, ProviderError, SafetyPolicy,
};
use crate::dtos::{AnalyzeAudioRequest, AnalyzeTextRequest, ChatRequest, SaveConversationRequest};
use crate::models::{AnalysisResult, ChatTurn, ConversationRecord, PronunciationResult};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use service_core::error::AppError;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use validator::Validate;

/// Recording format assumed when the client does not say otherwise.
const DEFAULT_AUDIO_MIME_TYPE: &str = "audio/webm";

/// External collaborator an operation depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependency {
    Model,
    Store,
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependency::Model => write!(f, "AI model"),
            Dependency::Store => write!(f, "conversation store"),
        }
    }
}

#[derive(Debug, Error)]
pub enum TutorError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid request: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("{0} is not configured")]
    ServiceUnavailable(Dependency),

    #[error("Model returned invalid JSON: {0}")]
    UpstreamFormat(#[source] serde_json::Error),

    #[error("Model returned an unexpected shape: {0}")]
    UpstreamShape(String),

    #[error("Model call failed: {0}")]
    Upstream(#[from] ProviderError),

    #[error("Store operation failed: {0}")]
    Store(#[source] AppError),

    #[error("Internal error: {0}")]
    Internal(anyhow::Error),
}

impl From<TutorError> for AppError {
    fn from(err: TutorError) -> Self {
        match err {
            TutorError::InvalidRequest(message) => AppError::BadRequest(anyhow::anyhow!(message)),
            TutorError::Validation(errors) => AppError::ValidationError(errors),
            TutorError::ServiceUnavailable(Dependency::Model) => AppError::ServiceUnavailable(
                "The AI model is not available right now. Make sure the API key is valid."
                    .to_string(),
            ),
            TutorError::ServiceUnavailable(Dependency::Store) => {
                AppError::ServiceUnavailable("The database is not available.".to_string())
            }
            TutorError::UpstreamFormat(e) => AppError::UpstreamError {
                message: "The server could not process the AI response. Please try again."
                    .to_string(),
                cause: anyhow::Error::new(e),
            },
            TutorError::UpstreamShape(detail) => AppError::UpstreamError {
                message: "The AI response did not have the expected format. Please try again."
                    .to_string(),
                cause: anyhow::anyhow!(detail),
            },
            TutorError::Upstream(e) => AppError::UpstreamError {
                message: "The AI service could not complete the request. Please try again."
                    .to_string(),
                cause: anyhow::Error::new(e),
            },
            TutorError::Store(e) => e,
            TutorError::Internal(e) => AppError::InternalError(e),
        }
    }
}

/// Request-handling core shared by all HTTP handlers.
///
/// Cheap to clone; the collaborators are shared read-only handles.
#[derive(Clone, Default)]
pub struct TutorGateway {
    model: Option<Arc<dyn GenerativeModel>>,
    store: Option<Arc<dyn ConversationStore>>,
}

impl TutorGateway {
    pub fn new(
        model: Option<Arc<dyn GenerativeModel>>,
        store: Option<Arc<dyn ConversationStore>>,
    ) -> Self {
        Self { model, store }
    }

    pub fn model(&self) -> Option<&Arc<dyn GenerativeModel>> {
        self.model.as_ref()
    }

    pub fn store(&self) -> Option<&Arc<dyn ConversationStore>> {
        self.store.as_ref()
    }

    /// Fail with 503 when no model is configured, before any input is read.
    pub fn ensure_model(&self) -> Result<(), TutorError> {
        self.require_model().map(|_| ())
    }

    /// Fail with 503 when no store is configured, before any input is read.
    pub fn ensure_store(&self) -> Result<(), TutorError> {
        self.require_store().map(|_| ())
    }

    fn require_model(&self) -> Result<&dyn GenerativeModel, TutorError> {
        self.model
            .as_deref()
            .ok_or(TutorError::ServiceUnavailable(Dependency::Model))
    }

    fn require_store(&self) -> Result<&dyn ConversationStore, TutorError> {
        self.store
            .as_deref()
            .ok_or(TutorError::ServiceUnavailable(Dependency::Store))
    }

    /// Continue a conversation; the model must answer with JSON, which is
    /// returned parsed.
    pub async fn chat(&self, request: ChatRequest) -> Result<serde_json::Value, TutorError> {
        let model = self.require_model()?;
        request.validate()?;

        let prompt = request.prompt.unwrap_or_default();
        let history = parse_history(request.history.unwrap_or_default())?;

        tracing::info!(history_len = history.len(), "Processing chat message");

        let completion_request = CompletionRequest::text(prompt).with_history(history).json();
        let completion = complete(model, "chat", &completion_request).await?;

        serde_json::from_str(&completion.text).map_err(|e| {
            tracing::error!(error = %e, raw = %completion.text, "Model did not return valid JSON");
            metrics::record_rejected_completion("chat", "format");
            TutorError::UpstreamFormat(e)
        })
    }

    /// Writing feedback on one sentence, as plain text.
    pub async fn analyze_text(
        &self,
        request: AnalyzeTextRequest,
    ) -> Result<AnalysisResult, TutorError> {
        let model = self.require_model()?;
        request.validate()?;

        let language = Language::from_code(request.language.as_deref());
        let sentence = request.sentence.unwrap_or_default();
        let prompt = writing_feedback_prompt(language, &sentence);

        tracing::info!(language = language.code(), "Analyzing text");

        let completion = complete(model, "analyze_text", &CompletionRequest::text(prompt))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Unexpected error while analyzing text");
                TutorError::Internal(anyhow::Error::new(e))
            })?;

        Ok(AnalysisResult {
            feedback: completion.text,
        })
    }

    /// Transcribe a recording and grade the pronunciation of each word.
    pub async fn analyze_audio(
        &self,
        request: AnalyzeAudioRequest,
    ) -> Result<PronunciationResult, TutorError> {
        let model = self.require_model()?;
        request.validate()?;

        let payload = request.base64_audio.unwrap_or_default();
        let (embedded_mime_type, encoded) = split_data_url(&payload);
        // Wrapped base64 (e.g. MIME-style line breaks) is accepted.
        let encoded: String = encoded
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let audio = STANDARD.decode(&encoded).map_err(|e| {
            TutorError::InvalidRequest(format!("Audio is not valid base64: {}", e))
        })?;
        if audio.is_empty() {
            return Err(TutorError::InvalidRequest("No audio provided".to_string()));
        }

        let mime_type = request
            .mime_type
            .or(embedded_mime_type)
            .unwrap_or_else(|| DEFAULT_AUDIO_MIME_TYPE.to_string());
        if !mime_type.starts_with("audio/") {
            return Err(TutorError::InvalidRequest(format!(
                "Unsupported audio type: {}",
                mime_type
            )));
        }
        let language = Language::from_code(request.language.as_deref());

        tracing::info!(
            language = language.code(),
            mime_type = %mime_type,
            audio_bytes = audio.len(),
            "Analyzing pronunciation"
        );

        let completion_request = CompletionRequest::text(pronunciation_instruction(language))
            .with_media(mime_type, audio)
            .json()
            .with_safety(SafetyPolicy::BlockNone);
        let completion = complete(model, "analyze_audio", &completion_request).await?;

        parse_pronunciation(&completion.text)
    }

    /// Persist a conversation verbatim and return the new record's id.
    pub async fn save_conversation(
        &self,
        request: SaveConversationRequest,
    ) -> Result<String, TutorError> {
        let store = self.require_store()?;

        let record = ConversationRecord::new(request.user_id, request.history, request.timestamp);
        let id = store.insert(record).await.map_err(TutorError::Store)?;

        tracing::info!(conversation_id = %id, "Conversation saved");
        Ok(id)
    }
}

/// Call the model once, recording latency, usage and failures.
async fn complete(
    model: &dyn GenerativeModel,
    operation: &'static str,
    request: &CompletionRequest,
) -> Result<Completion, ProviderError> {
    let started = Instant::now();
    let result = model.generate(request).await;
    metrics::record_provider_call(
        model.provider(),
        model.model_name(),
        operation,
        started.elapsed().as_secs_f64(),
    );

    match &result {
        Ok(completion) => {
            metrics::record_tokens(
                model.model_name(),
                completion.input_tokens,
                completion.output_tokens,
            );
            tracing::debug!(
                operation,
                finish_reason = completion.finish_reason.as_str(),
                output_len = completion.text.len(),
                "Model call completed"
            );
        }
        Err(e) => {
            metrics::record_provider_error(model.provider(), e.kind());
            tracing::warn!(operation, error = %e, "Model call failed");
        }
    }

    result
}

fn parse_history(entries: Vec<serde_json::Value>) -> Result<Vec<ChatTurn>, TutorError> {
    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            serde_json::from_value(entry).map_err(|e| {
                TutorError::InvalidRequest(format!("Invalid history entry at index {}: {}", index, e))
            })
        })
        .collect()
}

/// Split an optional `data:<mime>;base64,` prefix off an encoded payload.
fn split_data_url(payload: &str) -> (Option<String>, &str) {
    let Some(rest) = payload.strip_prefix("data:") else {
        return (None, payload);
    };

    match rest.split_once(";base64,") {
        Some((mime_type, data)) if !mime_type.is_empty() => {
            // Drop codec parameters such as `;codecs=opus`.
            let mime_type = mime_type.split(';').next().unwrap_or(mime_type);
            (Some(mime_type.to_string()), data)
        }
        Some((_, data)) => (None, data),
        None => (None, payload),
    }
}

/// Accept a pronunciation completion only if it is JSON of the exact
/// expected shape with a non-empty transcription.
fn parse_pronunciation(text: &str) -> Result<PronunciationResult, TutorError> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(|e| {
        tracing::error!(error = %e, raw = %text, "Pronunciation response is not valid JSON");
        metrics::record_rejected_completion("analyze_audio", "format");
        TutorError::UpstreamFormat(e)
    })?;

    let shape_error = |detail: String| {
        tracing::error!(detail = %detail, raw = %text, "Pronunciation response has an unexpected shape");
        metrics::record_rejected_completion("analyze_audio", "shape");
        TutorError::UpstreamShape(detail)
    };

    let result: PronunciationResult =
        serde_json::from_value(value).map_err(|e| shape_error(e.to_string()))?;
    result.validate().map_err(|e| shape_error(e.to_string()))?;

    Ok(result)
}
