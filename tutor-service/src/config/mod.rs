use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_DATABASE: &str = "language_tutor";
const DEFAULT_COLLECTION: &str = "conversations";

/// Base64 audio easily exceeds axum's 2MB default body limit.
pub const DEFAULT_MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct TutorConfig {
    pub common: core_config::Config,
    pub gemini: GeminiSettings,
    pub mongodb: MongoSettings,
    pub max_body_bytes: usize,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    /// `None` runs the service without AI features.
    pub api_key: Option<Secret<String>>,
    pub model: String,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct MongoSettings {
    /// `None` runs the service without conversation persistence.
    pub uri: Option<Secret<String>>,
    pub database: String,
    pub collection: String,
}

impl TutorConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        Self::from_lookup(common_config, |key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let is_prod = lookup("ENVIRONMENT").unwrap_or_else(|| "dev".to_string()) == "prod";
        let get = |key: &str, default: &str| get_env(&lookup, key, default, is_prod);

        let max_body_bytes = get("MAX_BODY_BYTES", &DEFAULT_MAX_BODY_BYTES.to_string())?
            .parse()
            .map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("MAX_BODY_BYTES is not a valid size: {}", e))
            })?;

        Ok(TutorConfig {
            common,
            gemini: GeminiSettings {
                api_key: optional_env(&lookup, "GEMINI_API_KEY").map(Secret::new),
                model: get("GEMINI_MODEL", DEFAULT_GEMINI_MODEL)?,
                api_base: get("GEMINI_API_BASE", DEFAULT_GEMINI_API_BASE)?,
            },
            mongodb: MongoSettings {
                uri: optional_env(&lookup, "MONGO_URI").map(Secret::new),
                database: get("MONGO_DATABASE", DEFAULT_DATABASE)?,
                collection: get("MONGO_COLLECTION", DEFAULT_COLLECTION)?,
            },
            max_body_bytes,
            otlp_endpoint: optional_env(&lookup, "OTLP_ENDPOINT"),
        })
    }
}

/// Unset and blank values are both treated as absent.
fn optional_env<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn get_env<F>(lookup: &F, key: &str, default: &str, is_prod: bool) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => Ok(val),
        None if is_prod => Err(AppError::ConfigError(anyhow::anyhow!(
            "{} is required in production but not set",
            key
        ))),
        None => Ok(default.to_string()),
    }
}
