use crate::config::TelemetryConfig;
use std::fmt;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
pub enum TelemetryError {
    EnvFilter { value: String, source: ParseError },
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::EnvFilter { value, .. } => {
                write!(f, "APP_LOG_LEVEL '{value}' is not a valid tracing directive")
            }
            TelemetryError::Subscriber(err) => {
                write!(f, "sync logging already initialised or unavailable: {err}")
            }
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::EnvFilter { source, .. } => Some(source),
            TelemetryError::Subscriber(err) => Some(&**err),
        }
    }
}

/// Install the process-wide subscriber. `RUST_LOG` wins over the configured level.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let env_filter = resolve_filter(rust_log.as_deref(), &config.log_level)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(TelemetryError::Subscriber)
}

/// An unparsable `RUST_LOG` falls back to the configured level.
fn resolve_filter(rust_log: Option<&str>, configured: &str) -> Result<EnvFilter, TelemetryError> {
    match rust_log.map(EnvFilter::try_new) {
        Some(Ok(filter)) => Ok(filter),
        _ => build_filter(configured),
    }
}

fn build_filter(level: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(level).map_err(|source| TelemetryError::EnvFilter {
        value: level.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_directive_lists() {
        assert!(build_filter("info,applicant_sync=debug").is_ok());
    }

    #[test]
    fn rejects_garbage_levels() {
        match build_filter("applicant_sync=loud") {
            Err(TelemetryError::EnvFilter { value, .. }) => assert_eq!(value, "applicant_sync=loud"),
            other => panic!("expected filter error, got {other:?}"),
        }
    }

    #[test]
    fn rust_log_overrides_the_configured_level() {
        let filter = resolve_filter(Some("applicant_sync=trace"), "warn").expect("valid filter");
        assert_eq!(filter.to_string(), "applicant_sync=trace");

        let filter = resolve_filter(None, "warn").expect("valid filter");
        assert_eq!(filter.to_string(), "warn");
    }

    #[test]
    fn unparsable_rust_log_falls_back_to_configured_level() {
        let filter = resolve_filter(Some("applicant_sync=loud"), "debug").expect("fallback");
        assert_eq!(filter.to_string(), "debug");

        assert!(matches!(
            resolve_filter(Some("applicant_sync=loud"), "also=loud"),
            Err(TelemetryError::EnvFilter { value, .. }) if value == "also=loud"
        ));
    }

    #[test]
    fn filter_errors_name_the_log_level_variable() {
        let err = build_filter("applicant_sync=loud").expect_err("invalid directive");
        assert_eq!(
            err.to_string(),
            "APP_LOG_LEVEL 'applicant_sync=loud' is not a valid tracing directive"
        );
    }
}
