use service_core::observability::{init_metrics, init_tracing};
use tutor_service::config::TutorConfig;
use tutor_service::startup::Application;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_metrics();

    let config = TutorConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    init_tracing(
        "tutor-service",
        &config.common.log_level,
        config.otlp_endpoint.as_deref(),
    );

    let application = Application::build(config).await.map_err(|e| {
        tracing::error!("Failed to build application: {}", e);
        std::io::Error::other(format!("Startup error: {}", e))
    })?;

    application.run_until_stopped().await
}
