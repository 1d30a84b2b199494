//! Shared helpers for router-level tests.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;
use tutor_service::services::providers::mock::MockModel;
use tutor_service::services::providers::GenerativeModel;
use tutor_service::services::{ConversationStore, InMemoryConversationStore, TutorGateway};
use tutor_service::startup::{build_router, AppState};

pub const PRONUNCIATION_REPLY: &str = r#"{
    "transcribedText": "hola mundo",
    "wordFeedback": [
        {"word": "hola", "correctlyPronounced": true, "feedback": "Clear."},
        {"word": "mundo", "correctlyPronounced": false, "feedback": "Soften the d."}
    ]
}"#;

/// Router wired to the given collaborators; `None` disables the feature.
pub fn router(
    model: Option<Arc<MockModel>>,
    store: Option<Arc<InMemoryConversationStore>>,
) -> Router {
    let model = model.map(|model| model as Arc<dyn GenerativeModel>);
    let store = store.map(|store| store as Arc<dyn ConversationStore>);
    build_router(AppState::new(TutorGateway::new(model, store)))
}

pub fn router_with_model(reply: &str) -> (Router, Arc<MockModel>) {
    let model = Arc::new(MockModel::replying(reply));
    (router(Some(model.clone()), None), model)
}

pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

pub async fn post_json(router: Router, path: &str, body: Value) -> (StatusCode, Value) {
    post_raw(router, path, body.to_string()).await
}

pub async fn post_raw(router: Router, path: &str, body: String) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    send(router, request).await
}
