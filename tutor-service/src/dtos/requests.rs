//! Request bodies of the tutor API.
//!
//! Required fields are `Option`s so that a missing field reaches validation
//! (and its message) instead of failing JSON extraction.

use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ChatRequest {
    #[serde(default)]
    #[validate(
        required(message = "No prompt provided"),
        length(min = 1, message = "No prompt provided")
    )]
    pub prompt: Option<String>,

    /// Prior turns, validated one by one when the chat is built.
    #[serde(default)]
    pub history: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AnalyzeTextRequest {
    #[serde(default)]
    #[validate(
        required(message = "No text provided for analysis"),
        length(min = 1, message = "No text provided for analysis")
    )]
    pub sentence: Option<String>,

    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeAudioRequest {
    #[serde(default)]
    #[validate(
        required(message = "No audio provided"),
        length(min = 1, message = "No audio provided")
    )]
    pub base64_audio: Option<String>,

    #[serde(default)]
    pub language: Option<String>,

    /// Recording format; the web client records `audio/webm`.
    #[serde(default)]
    #[validate(custom(function = "validate_audio_mime_type"))]
    pub mime_type: Option<String>,
}

fn validate_audio_mime_type(mime_type: &str) -> Result<(), validator::ValidationError> {
    if mime_type.starts_with("audio/") {
        Ok(())
    } else {
        let mut error = validator::ValidationError::new("audio_mime_type");
        error.message = Some("mimeType must be an audio type".into());
        Err(error)
    }
}

/// Conversation to persist. Stored as received, without validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveConversationRequest {
    #[serde(default)]
    pub user_id: serde_json::Value,

    #[serde(default)]
    pub history: serde_json::Value,

    #[serde(default)]
    pub timestamp: serde_json::Value,
}
