pub mod chat;
pub mod conversation;
pub mod feedback;

pub use chat::{ChatTurn, Role};
pub use conversation::ConversationRecord;
pub use feedback::{AnalysisResult, PronunciationResult, WordFeedback};
