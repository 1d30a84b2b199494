use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

fn feature_status(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}

/// Liveness probe. Reports which features are running.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "tutor-service",
            "version": env!("CARGO_PKG_VERSION"),
            "ai": feature_status(state.gateway.model().is_some()),
            "database": feature_status(state.gateway.store().is_some()),
        })),
    )
}

/// Readiness probe. Fails only when a configured store stops answering.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let Some(store) = state.gateway.store() else {
        return (StatusCode::OK, Json(json!({ "status": "ready" })));
    };

    match store.health_check().await {
        Ok(_) => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}

pub async fn metrics() -> impl IntoResponse {
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4",
        )],
        service_core::observability::render_metrics(),
    )
}
