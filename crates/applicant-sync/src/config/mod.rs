use std::env;
use std::fmt;
use std::time::Duration;

use crate::completion::RetryPolicy;

const DEFAULT_AIRTABLE_API_URL: &str = "https://api.airtable.com/v0";
const DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";

/// Top-level configuration, loaded once per process and handed to each component.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub airtable: AirtableConfig,
    pub completion: CompletionConfig,
    pub retry: RetryPolicy,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let airtable = AirtableConfig {
            api_key: required("AIRTABLE_API_KEY")?,
            base_id: required("AIRTABLE_BASE_ID")?,
            api_url: env::var("AIRTABLE_API_URL")
                .unwrap_or_else(|_| DEFAULT_AIRTABLE_API_URL.to_string()),
        };

        let completion = CompletionConfig {
            api_key: env::var("OPENAI_API_KEY")
                .ok()
                .filter(|value| !value.trim().is_empty()),
            api_url: env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_API_URL.to_string()),
            model: env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_OPENAI_MODEL.to_string()),
            max_tokens: parsed("OPENAI_MAX_TOKENS", 500)?,
            temperature: parsed("OPENAI_TEMPERATURE", 0.7)?,
        };

        let defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            max_attempts: parsed("ENRICH_MAX_ATTEMPTS", defaults.max_attempts)?,
            base_delay: Duration::from_millis(parsed(
                "ENRICH_BACKOFF_MS",
                defaults.base_delay.as_millis() as u64,
            )?),
            multiplier: defaults.multiplier,
        };
        if retry.max_attempts == 0 {
            return Err(ConfigError::InvalidNumber {
                var: "ENRICH_MAX_ATTEMPTS",
                value: "0".to_string(),
            });
        }

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            airtable,
            completion,
            retry,
            telemetry: TelemetryConfig { log_level },
        })
    }
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVar(var)),
    }
}

fn parsed<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { var, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Connection settings for the Airtable base holding the applicant tables.
#[derive(Clone)]
pub struct AirtableConfig {
    pub api_key: String,
    pub base_id: String,
    pub api_url: String,
}

impl fmt::Debug for AirtableConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AirtableConfig")
            .field("api_key", &"<redacted>")
            .field("base_id", &self.base_id)
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Chat completion settings used by the enrichment engine.
#[derive(Clone)]
pub struct CompletionConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl fmt::Debug for CompletionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    MissingVar(&'static str),
    InvalidNumber { var: &'static str, value: String },
    HttpClient(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingVar(var) => write!(f, "{var} must be set"),
            ConfigError::InvalidNumber { var, value } => {
                write!(f, "{var} must be a valid number (got '{value}')")
            }
            ConfigError::HttpClient(reason) => write!(f, "could not build HTTP client: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}
