//! Generative model abstraction.
//!
//! The gateway only talks to [`GenerativeModel`]; Gemini is the production
//! backend and [`mock::MockModel`] stands in for it in tests.

pub mod gemini;
pub mod mock;

use crate::models::ChatTurn;
use async_trait::async_trait;
use thiserror::Error;

/// Error type for provider operations.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Content filtered: {0}")]
    ContentFiltered(String),

    #[error("Empty response from model")]
    EmptyResponse,

    #[error("Network error: {0}")]
    NetworkError(String),
}

impl ProviderError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured(_) => "not_configured",
            ProviderError::ApiError(_) => "api",
            ProviderError::RateLimited => "rate_limited",
            ProviderError::ContentFiltered(_) => "content_filtered",
            ProviderError::EmptyResponse => "empty",
            ProviderError::NetworkError(_) => "network",
        }
    }
}

/// One piece of the final user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptPart {
    Text(String),
    /// Binary media sent inline, e.g. a voice recording.
    Media { mime_type: String, data: Vec<u8> },
}

/// Output constraint requested from the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseFormat {
    #[default]
    Text,
    Json,
}

/// Content filtering applied by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SafetyPolicy {
    /// Provider defaults.
    #[default]
    Default,
    /// Never block hate speech, harassment, sexually explicit or dangerous
    /// content. Learner recordings trip the filters on harmless speech.
    BlockNone,
}

/// A single, stateless completion request: prior turns plus a new user turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionRequest {
    pub history: Vec<ChatTurn>,
    pub parts: Vec<PromptPart>,
    pub response_format: ResponseFormat,
    pub safety: SafetyPolicy,
}

impl CompletionRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            parts: vec![PromptPart::Text(prompt.into())],
            ..Self::default()
        }
    }

    pub fn with_history(mut self, history: Vec<ChatTurn>) -> Self {
        self.history = history;
        self
    }

    pub fn with_media(mut self, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        self.parts.push(PromptPart::Media {
            mime_type: mime_type.into(),
            data,
        });
        self
    }

    pub fn json(mut self) -> Self {
        self.response_format = ResponseFormat::Json;
        self
    }

    pub fn with_safety(mut self, safety: SafetyPolicy) -> Self {
        self.safety = safety;
        self
    }

    /// Concatenated text parts of the new user turn.
    pub fn prompt_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                PromptPart::Text(text) => Some(text.as_str()),
                PromptPart::Media { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Reason why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Complete,
    Length,
    Other,
}

impl FinishReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinishReason::Complete => "complete",
            FinishReason::Length => "length",
            FinishReason::Other => "other",
        }
    }
}

/// Completion text with usage figures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub input_tokens: i32,
    pub output_tokens: i32,
    pub finish_reason: FinishReason,
}

impl Completion {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            input_tokens: 0,
            output_tokens: 0,
            finish_reason: FinishReason::Complete,
        }
    }
}

/// Text and multimodal completion backend.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Provider label for logs and metrics.
    fn provider(&self) -> &'static str;

    /// Model identifier, e.g. `gemini-1.5-flash`.
    fn model_name(&self) -> &str;

    async fn generate(&self, request: &CompletionRequest) -> Result<Completion, ProviderError>;
}
