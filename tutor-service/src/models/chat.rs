//! Conversation turns supplied by the client as chat history.

use serde::{Deserialize, Serialize};

/// Author of a turn. The client's `assistant` maps onto the model role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[serde(alias = "assistant")]
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// One prior turn of a chat, reduced to its text parts.
///
/// Accepts both the provider-native shape `{role, parts: [..]}` (parts being
/// strings or `{text}` objects) and the simpler `{role, content}` shape. A
/// structured `content` (e.g. an earlier JSON reply) is kept as JSON text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawChatTurn")]
pub struct ChatTurn {
    pub role: Role,
    pub parts: Vec<String>,
}

impl ChatTurn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![text.into()],
        }
    }
}

#[derive(Deserialize)]
struct RawChatTurn {
    role: Role,
    #[serde(default)]
    parts: Option<Vec<RawPart>>,
    #[serde(default)]
    content: Option<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPart {
    Text(String),
    Object { text: String },
}

impl TryFrom<RawChatTurn> for ChatTurn {
    type Error = String;

    fn try_from(raw: RawChatTurn) -> Result<Self, Self::Error> {
        let parts: Vec<String> = match (raw.parts, raw.content) {
            (Some(parts), _) => parts
                .into_iter()
                .map(|part| match part {
                    RawPart::Text(text) | RawPart::Object { text } => text,
                })
                .collect(),
            (None, Some(serde_json::Value::String(text))) => vec![text],
            (None, Some(serde_json::Value::Null)) | (None, None) => {
                return Err("turn has neither parts nor content".to_string())
            }
            (None, Some(structured)) => vec![structured.to_string()],
        };

        if parts.is_empty() {
            return Err("turn has no text parts".to_string());
        }

        Ok(ChatTurn {
            role: raw.role,
            parts,
        })
    }
}
