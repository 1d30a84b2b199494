//! Router-level tests for the tutor API, run against a mock model and an
//! in-memory conversation store.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::{post_json, post_raw, router, router_with_model, send, PRONUNCIATION_REPLY};
use serde_json::json;
use std::sync::Arc;
use tutor_service::services::providers::mock::MockModel;
use tutor_service::services::providers::{ProviderError, SafetyPolicy};
use tutor_service::services::{ConversationStore, InMemoryConversationStore, TutorGateway};
use tutor_service::startup::{build_router, AppState};

fn audio_body(language: &str) -> serde_json::Value {
    json!({
        "base64Audio": STANDARD.encode(b"\x1a\x45\xdf\xa3 webm"),
        "language": language,
    })
}

// ---------------------------------------------------------------------------
// /api/chat
// ---------------------------------------------------------------------------

#[tokio::test]
async fn chat_returns_the_model_json_under_message() {
    let (app, model) = router_with_model(r#"{"x":1}"#);

    let (status, body) = post_json(app, "/api/chat", json!({"prompt": "Hello", "history": []})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": {"x": 1}}));
    assert_eq!(model.call_count(), 1);
}

#[tokio::test]
async fn chat_passes_history_to_the_model() {
    let (app, model) = router_with_model(r#"{"reply":"¡Muy bien!"}"#);

    let (status, _) = post_json(
        app,
        "/api/chat",
        json!({
            "prompt": "¿Cómo estás?",
            "history": [
                {"role": "user", "parts": [{"text": "Hola"}]},
                {"role": "model", "parts": [{"text": "{\"reply\":\"¡Hola!\"}"}]}
            ]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let request = &model.requests()[0];
    assert_eq!(request.history.len(), 2);
    assert_eq!(request.history[0].parts, vec!["Hola".to_string()]);
    assert_eq!(request.prompt_text(), "¿Cómo estás?");
}

#[tokio::test]
async fn chat_without_prompt_is_rejected_before_the_model_is_called() {
    let (app, model) = router_with_model("{}");

    let (status, body) = post_json(app, "/api/chat", json!({"history": []})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No prompt provided");
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn chat_with_malformed_history_entry_is_rejected() {
    let (app, model) = router_with_model("{}");

    let (status, body) = post_json(
        app,
        "/api/chat",
        json!({"prompt": "Hi", "history": [{"role": "narrator", "content": "..."}]}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("index 0"));
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn chat_rejects_non_json_completion_without_leaking_it() {
    let (app, _) = router_with_model("Sure! Here is your answer: hola");

    let (status, body) = post_json(app, "/api/chat", json!({"prompt": "Hello"})).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error = body["error"].as_str().expect("error field");
    assert!(!error.is_empty());
    assert!(!error.contains("Here is your answer"));
}

#[tokio::test]
async fn chat_provider_failure_is_a_server_error() {
    let model = Arc::new(MockModel::failing(ProviderError::ApiError(
        "HTTP 500: backend exploded".to_string(),
    )));
    let app = router(Some(model), None);

    let (status, body) = post_json(app, "/api/chat", json!({"prompt": "Hello"})).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body["error"].as_str().unwrap().contains("exploded"));
}

// ---------------------------------------------------------------------------
// Model availability
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ai_endpoints_answer_503_without_a_model() {
    let requests = [
        ("/api/chat", json!({"prompt": "Hello"})),
        ("/api/analyze_text", json!({"sentence": "Hello", "language": "en"})),
        ("/api/analyze-audio", audio_body("en")),
    ];

    for (path, payload) in requests {
        let (status, body) = post_json(router(None, None), path, payload).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{path}");
        assert!(body["error"].is_string(), "{path}");
    }
}

#[tokio::test]
async fn availability_is_checked_before_input() {
    let (status, _) = post_json(router(None, None), "/api/chat", json!({})).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn availability_is_checked_before_body_extraction() {
    let bodies = [
        ("/api/chat", r#"{"prompt": 5}"#),
        ("/api/analyze_text", "{not json"),
        ("/api/analyze-audio", r#"{"base64Audio": ["AAAA"]}"#),
    ];

    for (path, body) in bodies {
        let (status, _) = post_raw(router(None, None), path, body.to_string()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{path}");
    }
}

#[tokio::test]
async fn save_without_store_is_503_even_without_content_type() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/save_conversation")
        .body(Body::from("user_id=u1"))
        .unwrap();

    let (status, body) = send(router(None, None), request).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "The database is not available.");
}

#[tokio::test]
async fn bad_body_is_still_400_when_model_is_configured() {
    let (app, model) = router_with_model("{}");

    let (status, _) = post_raw(app, "/api/chat", r#"{"prompt": 5}"#.to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(model.call_count(), 0);
}

// ---------------------------------------------------------------------------
// /api/analyze_text
// ---------------------------------------------------------------------------

#[tokio::test]
async fn analyze_text_returns_plain_feedback() {
    let (app, model) = router_with_model("Tu frase es correcta.");

    let (status, body) = post_json(
        app,
        "/api/analyze_text",
        json!({"sentence": "Yo soy estudiante", "language": "es"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"feedback": "Tu frase es correcta."}));

    let prompt = model.requests()[0].prompt_text();
    assert!(prompt.starts_with("Eres un tutor de escritura profesional."));
    assert!(prompt.contains("Yo soy estudiante"));
}

#[tokio::test]
async fn analyze_text_uses_english_persona_for_other_languages() {
    let (app, model) = router_with_model("Looks good.");

    let (status, _) = post_json(
        app,
        "/api/analyze_text",
        json!({"sentence": "Ich bin Student", "language": "de"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(model.requests()[0]
        .prompt_text()
        .starts_with("You are a professional writing tutor."));
}

#[tokio::test]
async fn analyze_text_requires_a_sentence() {
    let (app, model) = router_with_model("unused");

    let (status, body) = post_json(app, "/api/analyze_text", json!({"language": "es"})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No text provided for analysis");
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn analyze_text_failure_returns_generic_message() {
    let model = Arc::new(MockModel::failing(ProviderError::NetworkError(
        "connection refused (os error 111)".to_string(),
    )));
    let app = router(Some(model), None);

    let (status, body) = post_json(app, "/api/analyze_text", json!({"sentence": "Hi"})).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error. Please try again.");
}

// ---------------------------------------------------------------------------
// /api/analyze-audio
// ---------------------------------------------------------------------------

#[tokio::test]
async fn analyze_audio_returns_transcription_and_word_feedback() {
    let (app, model) = router_with_model(PRONUNCIATION_REPLY);

    let (status, body) = post_json(app, "/api/analyze-audio", audio_body("es")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transcribedText"], "hola mundo");
    assert_eq!(body["wordFeedback"].as_array().unwrap().len(), 2);
    assert_eq!(body["wordFeedback"][1]["correctlyPronounced"], false);

    let request = &model.requests()[0];
    assert_eq!(request.safety, SafetyPolicy::BlockNone);
    assert!(request
        .prompt_text()
        .starts_with("Eres un tutor de pronunciación profesional."));
}

#[tokio::test]
async fn analyze_audio_rejects_completion_without_word_feedback() {
    let (app, _) = router_with_model(r#"{"transcribedText": "hola"}"#);

    let (status, body) = post_json(app, "/api/analyze-audio", audio_body("es")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
    assert!(body.get("transcribedText").is_none());
}

#[tokio::test]
async fn analyze_audio_rejects_empty_transcription() {
    let (app, _) = router_with_model(r#"{"transcribedText": "", "wordFeedback": []}"#);

    let (status, _) = post_json(app, "/api/analyze-audio", audio_body("en")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn analyze_audio_rejects_non_json_completion() {
    let (app, _) = router_with_model("I could not hear anything.");

    let (status, body) = post_json(app, "/api/analyze-audio", audio_body("en")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body["error"].as_str().unwrap().contains("could not hear"));
}

#[tokio::test]
async fn analyze_audio_requires_audio() {
    let (app, model) = router_with_model(PRONUNCIATION_REPLY);

    let (status, body) = post_json(app, "/api/analyze-audio", json!({"language": "es"})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No audio provided");
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn analyze_audio_rejects_malformed_base64() {
    let (app, model) = router_with_model(PRONUNCIATION_REPLY);

    let (status, _) = post_json(
        app,
        "/api/analyze-audio",
        json!({"base64Audio": "%%% definitely not base64 %%%"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn analyze_audio_rejects_non_audio_data_url() {
    let (app, model) = router_with_model(PRONUNCIATION_REPLY);

    let (status, body) = post_json(
        app,
        "/api/analyze-audio",
        json!({"base64Audio": "data:image/png;base64,eA=="}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn analyze_audio_rejects_non_audio_mime_type() {
    let (app, model) = router_with_model(PRONUNCIATION_REPLY);

    let mut payload = audio_body("en");
    payload["mimeType"] = json!("image/png");
    let (status, _) = post_json(app, "/api/analyze-audio", payload).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(model.call_count(), 0);
}

// ---------------------------------------------------------------------------
// /api/save_conversation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn save_conversation_returns_id_of_stored_record() {
    let store = Arc::new(InMemoryConversationStore::new());
    let app = router(None, Some(store.clone()));

    let (status, body) = post_json(
        app,
        "/api/save_conversation",
        json!({"user_id": "u1", "history": [], "timestamp": "t"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let id = body["id"].as_str().expect("id must be a string");
    assert!(!id.is_empty());
    assert!(body["message"].is_string());

    let stored = store.find(id).await.unwrap().expect("record exists");
    assert_eq!(stored.user_id, json!("u1"));
    assert_eq!(stored.history, json!([]));
    assert_eq!(stored.timestamp, json!("t"));
}

#[tokio::test]
async fn save_conversation_keeps_history_verbatim() {
    let store = Arc::new(InMemoryConversationStore::new());
    let history = json!([
        {"role": "user", "parts": [{"text": "¿Qué tal?"}]},
        {"role": "model", "parts": [{"text": "{\"reply\":\"Bien\"}"}], "meta": {"n": [1, 2]}},
        "free text entry"
    ]);

    let (status, _) = post_json(
        router(None, Some(store.clone())),
        "/api/save_conversation",
        json!({"user_id": 42, "history": history.clone(), "timestamp": 1700000000}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let records = store.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].history, history);
    assert_eq!(records[0].user_id, json!(42));
}

#[tokio::test]
async fn save_conversation_without_store_is_503() {
    let store_less = router(Some(Arc::new(MockModel::replying("{}"))), None);

    let (status, body) = post_json(
        store_less,
        "/api/save_conversation",
        json!({"user_id": "u1", "history": [], "timestamp": "t"}),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "The database is not available.");
}

#[tokio::test]
async fn save_conversation_store_failure_is_500() {
    let app = router(None, Some(Arc::new(InMemoryConversationStore::unavailable())));

    let (status, body) = post_json(
        app,
        "/api/save_conversation",
        json!({"user_id": "u1", "history": [], "timestamp": "t"}),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body["error"].as_str().unwrap().contains("connection refused"));
}

// ---------------------------------------------------------------------------
// Transport behaviour
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_json_body_is_400_with_error_field() {
    let (app, model) = router_with_model("{}");

    let (status, body) = post_raw(app, "/api/chat", "{not json".to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn non_object_body_is_400() {
    let store = Arc::new(InMemoryConversationStore::new());

    let (status, _) = post_raw(
        router(None, Some(store.clone())),
        "/api/save_conversation",
        "[1, 2, 3]".to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(store.records().is_empty());
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let model = Arc::new(MockModel::replying(PRONUNCIATION_REPLY));
    let gateway = TutorGateway::new(Some(model.clone()), None);
    let app = build_router(AppState::new(gateway).with_max_body_bytes(1024));

    let payload = json!({"base64Audio": STANDARD.encode(vec![0u8; 4096])});
    let (status, _) = post_json(app, "/api/analyze-audio", payload).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn cors_preflight_allows_any_origin() {
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/chat")
        .header("origin", "http://localhost:5173")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type")
        .body(Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(router(None, None), request)
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("content-type", "application/json")
        .header("x-request-id", "req-123")
        .body(Body::from(json!({"prompt": "Hi"}).to_string()))
        .unwrap();

    let response = tower::ServiceExt::oneshot(router(None, None), request)
        .await
        .unwrap();

    assert_eq!(response.headers()["x-request-id"], "req-123");
}

// ---------------------------------------------------------------------------
// Probes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_disabled_features() {
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let (status, body) = send(router(None, None), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "tutor-service");
    assert_eq!(body["ai"], "disabled");
    assert_eq!(body["database"], "disabled");
}

#[tokio::test]
async fn health_reports_enabled_features() {
    let app = router(
        Some(Arc::new(MockModel::replying("{}"))),
        Some(Arc::new(InMemoryConversationStore::new())),
    );
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let (_, body) = send(app, request).await;

    assert_eq!(body["ai"], "enabled");
    assert_eq!(body["database"], "enabled");
}

#[tokio::test]
async fn readiness_fails_when_store_stops_answering() {
    let request = || Request::builder().uri("/ready").body(Body::empty()).unwrap();

    let (status, _) = send(router(None, None), request()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        router(None, Some(Arc::new(InMemoryConversationStore::new()))),
        request(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        router(None, Some(Arc::new(InMemoryConversationStore::unavailable()))),
        request(),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unavailable");
}
