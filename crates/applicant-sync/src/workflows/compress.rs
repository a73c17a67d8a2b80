use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use super::enrichment::{EnrichmentEngine, EnrichmentError, EnrichmentOutcome};
use super::snapshot::mapping::{FieldMap, EXPERIENCE, PERSONAL, SALARY};
use super::snapshot::{ExperienceEntry, PersonalSection, SalarySection, Snapshot, SnapshotError};
use crate::completion::TextCompletion;
use crate::store::tables::applicants;
use crate::store::{Fields, Filter, Record, RecordId, RecordStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum CompressError {
    #[error("applicant {0} not found")]
    NotFound(String),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of compressing one applicant.
#[derive(Debug)]
pub struct CompressionReport {
    pub record_id: RecordId,
    pub snapshot: Snapshot,
    /// Exact text written to `Compressed JSON`.
    pub json: String,
    /// Outcome of the chained enrichment; a failure here does not undo the snapshot write.
    pub enrichment: Result<EnrichmentOutcome, EnrichmentError>,
}

/// Folds an applicant's child rows into the `Compressed JSON` snapshot, then enriches it.
pub struct SnapshotCompressor<S, C> {
    store: Arc<S>,
    enricher: Arc<EnrichmentEngine<S, C>>,
}

impl<S, C> SnapshotCompressor<S, C>
where
    S: RecordStore + 'static,
    C: TextCompletion + 'static,
{
    pub fn new(store: Arc<S>, enricher: Arc<EnrichmentEngine<S, C>>) -> Self {
        Self { store, enricher }
    }

    /// Build the snapshot for `applicant_id` without writing anything.
    pub fn build(&self, applicant_id: &str) -> Result<(Record, Snapshot), CompressError> {
        let applicant = self
            .store
            .query(applicants::TABLE, &Filter::eq(applicants::APPLICANT_ID, applicant_id))?
            .into_iter()
            .next()
            .ok_or_else(|| CompressError::NotFound(applicant_id.to_string()))?;

        let personal: Option<PersonalSection> = self
            .linked_rows(&PERSONAL, &applicant.id)?
            .first()
            .map(|row| PERSONAL.section_from_record(row))
            .transpose()?;

        let experience: Vec<ExperienceEntry> = self
            .linked_rows(&EXPERIENCE, &applicant.id)?
            .iter()
            .map(|row| EXPERIENCE.section_from_record(row))
            .collect::<Result<_, _>>()?;

        let salary: Option<SalarySection> = self
            .linked_rows(&SALARY, &applicant.id)?
            .first()
            .map(|row| SALARY.section_from_record(row))
            .transpose()?;

        Ok((
            applicant,
            Snapshot {
                personal,
                experience,
                salary,
            },
        ))
    }

    pub fn compress(&self, applicant_id: &str) -> Result<CompressionReport, CompressError> {
        let (applicant, snapshot) = self.build(applicant_id)?;
        let json = snapshot.to_json()?;

        let mut fields = Fields::new();
        fields.insert(
            applicants::COMPRESSED_JSON.to_string(),
            Value::String(json.clone()),
        );
        self.store.update(applicants::TABLE, &applicant.id, fields)?;
        info!(
            applicant_id,
            record_id = %applicant.id,
            experience = snapshot.experience.len(),
            "snapshot written"
        );

        let enrichment = self.enricher.enrich(&applicant.id);
        if let Err(err) = &enrichment {
            warn!(applicant_id, error = %err, "enrichment after compress failed");
        }

        Ok(CompressionReport {
            record_id: applicant.id,
            snapshot,
            json,
            enrichment,
        })
    }

    fn linked_rows(&self, map: &FieldMap, applicant: &RecordId) -> Result<Vec<Record>, StoreError> {
        self.store
            .query(map.table, &Filter::links_to(map.link, applicant))
    }
}
