pub mod requests;
pub mod responses;

pub use requests::{AnalyzeAudioRequest, AnalyzeTextRequest, ChatRequest, SaveConversationRequest};
pub use responses::{ChatResponse, SaveConversationResponse};
