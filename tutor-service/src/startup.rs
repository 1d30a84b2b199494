//! Application startup and lifecycle management.

use crate::config::{TutorConfig, DEFAULT_MAX_BODY_BYTES};
use crate::handlers;
use crate::services::providers::gemini::{GeminiConfig, GeminiModel};
use crate::services::providers::GenerativeModel;
use crate::services::{ConversationStore, MongoConversationStore, TutorGateway};
use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::middleware::{metrics_middleware, request_id_middleware, REQUEST_ID_HEADER};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub gateway: TutorGateway,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(gateway: TutorGateway) -> Self {
        Self {
            gateway,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

/// Full HTTP surface: tutor API, probes and metrics.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat", post(handlers::tutor::chat))
        .route("/api/analyze_text", post(handlers::tutor::analyze_text))
        .route("/api/save_conversation", post(handlers::tutor::save_conversation))
        .route("/api/analyze-audio", post(handlers::tutor::analyze_audio))
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::health::metrics))
        .layer(DefaultBodyLimit::max(state.max_body_bytes))
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(cors)
        .with_state(state)
}

/// Gemini client, or `None` when no API key is configured.
fn build_model(config: &TutorConfig) -> Option<Arc<dyn GenerativeModel>> {
    let Some(api_key) = config.gemini.api_key.clone() else {
        tracing::warn!("GEMINI_API_KEY is not set; AI endpoints will answer 503");
        return None;
    };

    let gemini_config = GeminiConfig {
        api_key,
        model: config.gemini.model.clone(),
        api_base: config.gemini.api_base.clone(),
    };

    match GeminiModel::new(gemini_config) {
        Ok(model) => {
            tracing::info!(model = %config.gemini.model, "Initialized Gemini model");
            let model: Arc<dyn GenerativeModel> = Arc::new(model);
            Some(model)
        }
        Err(e) => {
            tracing::error!("Failed to initialize Gemini model: {}", e);
            None
        }
    }
}

/// MongoDB store, or `None` when it is not configured or unreachable.
async fn connect_store(config: &TutorConfig) -> Option<Arc<dyn ConversationStore>> {
    let Some(uri) = config.mongodb.uri.as_ref() else {
        tracing::warn!("MONGO_URI is not set; conversations will not be saved");
        return None;
    };

    let store = match MongoConversationStore::connect(
        uri.expose_secret(),
        &config.mongodb.database,
        &config.mongodb.collection,
    )
    .await
    {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Failed to connect to MongoDB, persistence disabled: {}", e);
            return None;
        }
    };

    if let Err(e) = store.initialize_indexes().await {
        tracing::warn!("Failed to initialize database indexes: {}", e);
    }

    let store: Arc<dyn ConversationStore> = Arc::new(store);
    Some(store)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the given configuration.
    ///
    /// A missing API key or database only disables the features that need
    /// them; binding the listener is the only fatal step.
    pub async fn build(config: TutorConfig) -> Result<Self, AppError> {
        let model = build_model(&config);
        let store = connect_store(&config).await;

        let state = AppState::new(TutorGateway::new(model, store))
            .with_max_body_bytes(config.max_body_bytes);
        let router = build_router(state);

        // Port 0 picks a random port for tests.
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Tutor service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until Ctrl+C or SIGTERM, letting in-flight requests finish.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
