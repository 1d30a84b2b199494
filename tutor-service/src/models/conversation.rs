//! Saved conversation history.

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// A conversation exactly as the client submitted it. Fields are stored
/// verbatim (missing ones as null); records are never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub user_id: serde_json::Value,

    pub history: serde_json::Value,

    pub timestamp: serde_json::Value,
}

impl ConversationRecord {
    pub fn new(
        user_id: serde_json::Value,
        history: serde_json::Value,
        timestamp: serde_json::Value,
    ) -> Self {
        Self {
            id: None,
            user_id,
            history,
            timestamp,
        }
    }
}
