pub mod database;
pub mod memory_store;
pub mod metrics;
pub mod prompts;
pub mod providers;
pub mod tutor;

pub use database::{ConversationStore, MongoConversationStore};
pub use memory_store::InMemoryConversationStore;
pub use tutor::{TutorError, TutorGateway};
