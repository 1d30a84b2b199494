//! Tutor feedback returned to the client.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Free-form writing feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub feedback: String,
}

/// Pronunciation analysis of one recording.
///
/// This is also the shape the model is instructed to produce, so the
/// completion is deserialized straight into it and then validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PronunciationResult {
    #[validate(length(min = 1, message = "transcribedText must not be empty"))]
    pub transcribed_text: String,

    pub word_feedback: Vec<WordFeedback>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordFeedback {
    pub word: String,
    pub correctly_pronounced: bool,
    pub feedback: String,
}
