//! Conversation persistence.
//!
//! Conversations are insert-only: the gateway writes a record and hands back
//! its id; nothing here updates or deletes.

use crate::models::ConversationRecord;
use async_trait::async_trait;
use metrics::{counter, histogram};
use mongodb::{
    bson::{doc, oid::ObjectId},
    options::{ClientOptions, IndexOptions},
    Client as MongoClient, Collection, IndexModel,
};
use service_core::error::AppError;
use std::time::Instant;

/// Append-only store of saved conversations.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Insert a record and return its generated id.
    async fn insert(&self, record: ConversationRecord) -> Result<String, AppError>;

    /// Look up a record by the id returned from [`ConversationStore::insert`].
    async fn find(&self, id: &str) -> Result<Option<ConversationRecord>, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct MongoConversationStore {
    client: MongoClient,
    conversations: Collection<ConversationRecord>,
}

impl MongoConversationStore {
    /// Connect and ping the deployment so a bad URI surfaces at startup.
    pub async fn connect(uri: &str, database: &str, collection: &str) -> Result<Self, AppError> {
        tracing::info!(database = %database, collection = %collection, "Connecting to MongoDB");

        let mut options = ClientOptions::parse(uri).await.map_err(|e| {
            tracing::error!("Invalid MongoDB connection string: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;
        options.app_name = Some("tutor-service".to_string());

        let client = MongoClient::with_options(options)
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e.to_string())))?;

        let store = Self {
            conversations: client.database(database).collection(collection),
            client,
        };
        store.health_check().await?;

        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(store)
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        let user_id_index = IndexModel::builder()
            .keys(doc! { "user_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("user_id_idx".to_string())
                    .build(),
            )
            .build();

        self.conversations
            .create_index(user_id_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create user_id index: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;

        Ok(())
    }

    fn record_operation(&self, operation: &'static str, started: Instant, failed: bool) {
        let collection = self.conversations.name().to_string();
        histogram!(
            "db_operation_duration_seconds",
            "operation" => operation,
            "collection" => collection.clone()
        )
        .record(started.elapsed().as_secs_f64());
        if failed {
            counter!("db_errors_total", "operation" => operation, "collection" => collection)
                .increment(1);
        }
    }
}

#[async_trait]
impl ConversationStore for MongoConversationStore {
    async fn insert(&self, record: ConversationRecord) -> Result<String, AppError> {
        let started = Instant::now();
        let result = self.conversations.insert_one(&record, None).await;
        self.record_operation("insert", started, result.is_err());

        let result = result.map_err(|e| {
            tracing::error!("Failed to insert conversation: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;

        Ok(result
            .inserted_id
            .as_object_id()
            .map(|oid| oid.to_hex())
            .unwrap_or_else(|| result.inserted_id.to_string()))
    }

    async fn find(&self, id: &str) -> Result<Option<ConversationRecord>, AppError> {
        let Ok(oid) = ObjectId::parse_str(id) else {
            return Ok(None);
        };

        let started = Instant::now();
        let result = self.conversations.find_one(doc! { "_id": oid }, None).await;
        self.record_operation("find", started, result.is_err());

        result.map_err(|e| {
            tracing::error!("Failed to find conversation: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;
        Ok(())
    }
}
