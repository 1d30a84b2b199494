//! Mock model for tests.

use super::{Completion, CompletionRequest, GenerativeModel, ProviderError};
use async_trait::async_trait;
use std::sync::Mutex;

/// Replies with a fixed completion (or error) and records every request.
pub struct MockModel {
    reply: Result<String, ProviderError>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockModel {
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            reply: Ok(text.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: ProviderError) -> Self {
        Self {
            reply: Err(error),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests().len()
    }
}

#[async_trait]
impl GenerativeModel for MockModel {
    fn provider(&self) -> &'static str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }

    async fn generate(&self, request: &CompletionRequest) -> Result<Completion, ProviderError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        self.reply.clone().map(Completion::new)
    }
}
