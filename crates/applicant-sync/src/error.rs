use crate::config::ConfigError;
use crate::store::StoreError;
use crate::telemetry::TelemetryError;
use crate::workflows::compress::CompressError;
use crate::workflows::enrichment::EnrichmentError;
use crate::workflows::reconcile::ReconcileError;
use crate::workflows::shortlist::ShortlistError;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Store(StoreError),
    Compress(CompressError),
    Enrichment(EnrichmentError),
    Reconcile(ReconcileError),
    Shortlist(ShortlistError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Store(err) => write!(f, "store error: {}", err),
            AppError::Compress(err) => write!(f, "compress error: {}", err),
            AppError::Enrichment(err) => write!(f, "enrichment error: {}", err),
            AppError::Reconcile(err) => write!(f, "reconcile error: {}", err),
            AppError::Shortlist(err) => write!(f, "shortlist error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Store(err) => Some(err),
            AppError::Compress(err) => Some(err),
            AppError::Enrichment(err) => Some(err),
            AppError::Reconcile(err) => Some(err),
            AppError::Shortlist(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<CompressError> for AppError {
    fn from(value: CompressError) -> Self {
        Self::Compress(value)
    }
}

impl From<EnrichmentError> for AppError {
    fn from(value: EnrichmentError) -> Self {
        Self::Enrichment(value)
    }
}

impl From<ReconcileError> for AppError {
    fn from(value: ReconcileError) -> Self {
        Self::Reconcile(value)
    }
}

impl From<ShortlistError> for AppError {
    fn from(value: ShortlistError) -> Self {
        Self::Shortlist(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn display_prefixes_the_failing_layer() {
        let err = AppError::from(ConfigError::MissingVar("AIRTABLE_API_KEY"));
        assert_eq!(
            err.to_string(),
            "configuration error: AIRTABLE_API_KEY must be set"
        );
        assert!(err.source().is_some());

        let err = AppError::from(CompressError::NotFound("A-9".to_string()));
        assert_eq!(err.to_string(), "compress error: applicant A-9 not found");
    }
}
