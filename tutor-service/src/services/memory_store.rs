//! In-process conversation store used by tests.

use super::database::ConversationStore;
use crate::models::ConversationRecord;
use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use service_core::error::AppError;
use std::sync::Mutex;

#[derive(Default)]
pub struct InMemoryConversationStore {
    records: Mutex<Vec<ConversationRecord>>,
    unavailable: bool,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every operation fails, as if the database went away.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn records(&self) -> Vec<ConversationRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    fn check_available(&self) -> Result<(), AppError> {
        if self.unavailable {
            Err(AppError::DatabaseError(anyhow::anyhow!(
                "connection refused"
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn insert(&self, mut record: ConversationRecord) -> Result<String, AppError> {
        self.check_available()?;

        let id = ObjectId::new();
        record.id = Some(id);
        self.records
            .lock()
            .map_err(|_| AppError::DatabaseError(anyhow::anyhow!("store lock poisoned")))?
            .push(record);

        Ok(id.to_hex())
    }

    async fn find(&self, id: &str) -> Result<Option<ConversationRecord>, AppError> {
        self.check_available()?;

        let Ok(oid) = ObjectId::parse_str(id) else {
            return Ok(None);
        };

        Ok(self
            .records()
            .into_iter()
            .find(|record| record.id == Some(oid)))
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.check_available()
    }
}
