//! LLM enrichment of a single applicant, gated on the snapshot hash.

mod parser;
mod prompt;

pub use parser::{parse_response, Enrichment};
pub use prompt::build_prompt;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{info, warn};

use super::snapshot::snapshot_hash;
use crate::completion::{
    call_with_retry, CompletionError, RetryError, RetryPolicy, TextCompletion,
};
use crate::store::tables::applicants;
use crate::store::{Fields, RecordId, RecordStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentOutcome {
    /// Model called and fields written.
    Enriched(Enrichment),
    /// Stored hash matches the current snapshot; nothing called or written.
    Unchanged,
}

#[derive(Debug, thiserror::Error)]
pub enum EnrichmentError {
    #[error("applicant record {0} not found")]
    NotFound(RecordId),
    #[error("applicant record {0} has no Compressed JSON")]
    MissingSnapshot(RecordId),
    #[error("enrichment failed: {0}")]
    Failed(#[source] RetryError<CompletionError>),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Calls the completion service for applicants whose snapshot changed since the last run.
pub struct EnrichmentEngine<S, C> {
    store: Arc<S>,
    completion: Arc<C>,
    retry: RetryPolicy,
    sleep: fn(Duration),
}

impl<S, C> EnrichmentEngine<S, C>
where
    S: RecordStore + 'static,
    C: TextCompletion + 'static,
{
    pub fn new(store: Arc<S>, completion: Arc<C>, retry: RetryPolicy) -> Self {
        Self {
            store,
            completion,
            retry,
            sleep: std::thread::sleep,
        }
    }

    /// Replace the backoff sleep, e.g. with a no-op in tests.
    pub fn with_sleep(mut self, sleep: fn(Duration)) -> Self {
        self.sleep = sleep;
        self
    }

    pub fn enrich(&self, record_id: &RecordId) -> Result<EnrichmentOutcome, EnrichmentError> {
        let record = self
            .store
            .get(applicants::TABLE, record_id)?
            .ok_or_else(|| EnrichmentError::NotFound(record_id.clone()))?;

        let raw = record
            .text(applicants::COMPRESSED_JSON)
            .filter(|raw| !raw.trim().is_empty())
            .ok_or_else(|| EnrichmentError::MissingSnapshot(record_id.clone()))?;

        let hash = snapshot_hash(raw);
        if record.text(applicants::JSON_HASH) == Some(hash.as_str()) {
            info!(record_id = %record_id, "snapshot unchanged, skipping enrichment");
            return Ok(EnrichmentOutcome::Unchanged);
        }

        let prompt = build_prompt(raw);
        let response = call_with_retry(
            &self.retry,
            |_| self.completion.complete(&prompt),
            CompletionError::is_transient,
            self.sleep,
        )
        .map_err(|err| {
            warn!(record_id = %record_id, error = %err, "enrichment failed");
            EnrichmentError::Failed(err)
        })?;

        let enrichment = parse_response(&response);
        self.store
            .update(applicants::TABLE, record_id, enrichment_fields(&enrichment, hash))?;
        info!(record_id = %record_id, score = ?enrichment.score, "applicant enriched");

        Ok(EnrichmentOutcome::Enriched(enrichment))
    }
}

fn enrichment_fields(enrichment: &Enrichment, hash: String) -> Fields {
    let mut fields = Fields::new();
    fields.insert(
        applicants::LLM_SUMMARY.to_string(),
        Value::String(enrichment.summary.clone()),
    );
    fields.insert(
        applicants::LLM_SCORE.to_string(),
        enrichment.score.map(Value::from).unwrap_or(Value::Null),
    );
    fields.insert(
        applicants::LLM_ISSUES.to_string(),
        Value::String(enrichment.issues.clone()),
    );
    fields.insert(
        applicants::LLM_FOLLOW_UPS.to_string(),
        Value::String(enrichment.follow_ups.clone()),
    );
    fields.insert(applicants::JSON_HASH.to_string(), Value::String(hash));
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::sync::Mutex;

    struct Scripted {
        replies: Mutex<Vec<Result<String, CompletionError>>>,
        calls: Mutex<u32>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<String, CompletionError>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().expect("calls lock")
        }
    }

    impl TextCompletion for Scripted {
        fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
            *self.calls.lock().expect("calls lock") += 1;
            let mut replies = self.replies.lock().expect("replies lock");
            if replies.is_empty() {
                return Err(CompletionError::Fatal("script exhausted".to_string()));
            }
            replies.remove(0)
        }
    }

    fn no_sleep(_: Duration) {}

    fn engine(
        store: &Arc<MemoryStore>,
        completion: &Arc<Scripted>,
    ) -> EnrichmentEngine<MemoryStore, Scripted> {
        EnrichmentEngine::new(store.clone(), completion.clone(), RetryPolicy::default())
            .with_sleep(no_sleep)
    }

    fn applicant(store: &MemoryStore, snapshot: &str) -> RecordId {
        store.insert(
            applicants::TABLE,
            json!({ "Applicant ID": "A-1", "Compressed JSON": snapshot })
                .as_object()
                .cloned()
                .expect("object"),
        )
    }

    #[test]
    fn writes_fields_and_hash_in_one_update() {
        let store = Arc::new(MemoryStore::new());
        let id = applicant(&store, r#"{"personal":{}}"#);
        let completion = Arc::new(Scripted::new(vec![Ok(
            "Summary: Solid.\nScore: 7\nIssues: None\nFollow-Ups: - When can you start?".to_string(),
        )]));

        let outcome = engine(&store, &completion).enrich(&id).expect("enriches");
        assert!(matches!(outcome, EnrichmentOutcome::Enriched(ref e) if e.score == Some(7)));

        let row = store.get(applicants::TABLE, &id).expect("get").expect("row");
        assert_eq!(row.text(applicants::LLM_SUMMARY), Some("Solid."));
        assert_eq!(row.field(applicants::LLM_SCORE), Some(&json!(7)));
        assert_eq!(
            row.text(applicants::JSON_HASH),
            Some(snapshot_hash(r#"{"personal":{}}"#).as_str())
        );
        assert_eq!(store.operations().len(), 1);
    }

    #[test]
    fn transient_errors_are_retried() {
        let store = Arc::new(MemoryStore::new());
        let id = applicant(&store, r#"{"personal":{}}"#);
        let completion = Arc::new(Scripted::new(vec![
            Err(CompletionError::Transient("429".to_string())),
            Ok("Summary: Fine.\nScore: 6".to_string()),
        ]));

        engine(&store, &completion).enrich(&id).expect("enriches");
        assert_eq!(completion.calls(), 2);
    }

    #[test]
    fn fatal_error_leaves_record_untouched() {
        let store = Arc::new(MemoryStore::new());
        let id = applicant(&store, r#"{"personal":{}}"#);
        let completion = Arc::new(Scripted::new(vec![Err(CompletionError::Fatal(
            "401".to_string(),
        ))]));

        let err = engine(&store, &completion).enrich(&id).expect_err("fails");
        assert!(matches!(err, EnrichmentError::Failed(RetryError::Aborted(_))));
        assert_eq!(completion.calls(), 1);
        assert!(store.operations().is_empty());
    }

    #[test]
    fn missing_record_and_snapshot_are_reported() {
        let store = Arc::new(MemoryStore::new());
        let completion = Arc::new(Scripted::new(Vec::new()));
        let engine = engine(&store, &completion);

        let missing = engine.enrich(&RecordId::from("recNope")).expect_err("missing");
        assert!(matches!(missing, EnrichmentError::NotFound(_)));

        let id = store.insert(applicants::TABLE, Fields::new());
        let empty = engine.enrich(&id).expect_err("no snapshot");
        assert!(matches!(empty, EnrichmentError::MissingSnapshot(_)));
        assert_eq!(completion.calls(), 0);
    }
}
