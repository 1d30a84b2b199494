//! AI-specific metrics, exported through the service-core Prometheus recorder.

use metrics::{counter, histogram};

/// Record a completed model call.
pub fn record_provider_call(
    provider: &'static str,
    model: &str,
    operation: &'static str,
    duration_secs: f64,
) {
    histogram!(
        "tutor_provider_latency_seconds",
        "provider" => provider,
        "model" => model.to_string(),
        "operation" => operation
    )
    .record(duration_secs);
}

/// Record token usage reported by the model.
pub fn record_tokens(model: &str, input_tokens: i32, output_tokens: i32) {
    counter!("tutor_tokens_total", "model" => model.to_string(), "type" => "input")
        .increment(input_tokens.max(0) as u64);
    counter!("tutor_tokens_total", "model" => model.to_string(), "type" => "output")
        .increment(output_tokens.max(0) as u64);
}

/// Record a failed model call.
pub fn record_provider_error(provider: &'static str, error_type: &'static str) {
    counter!(
        "tutor_provider_errors_total",
        "provider" => provider,
        "error_type" => error_type
    )
    .increment(1);
}

/// Record a model reply rejected by validation (`format` or `shape`).
pub fn record_rejected_completion(operation: &'static str, reason: &'static str) {
    counter!(
        "tutor_rejected_completions_total",
        "operation" => operation,
        "reason" => reason
    )
    .increment(1);
}
