//! Rule-based shortlisting of applicants from their snapshot.

mod config;
mod rules;

pub use config::ShortlistRules;
pub use rules::{Criterion, CriterionResult};

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::snapshot::Snapshot;
use super::{read_snapshot, ApplicantRef, BatchOutcome, BatchReport, SkipReason};
use crate::store::tables::{applicants, leads};
use crate::store::{Fields, Filter, Record, RecordId, RecordStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ShortlistStatus {
    Shortlisted,
    NotShortlisted,
}

impl ShortlistStatus {
    pub fn label(self) -> &'static str {
        match self {
            ShortlistStatus::Shortlisted => "Shortlisted",
            ShortlistStatus::NotShortlisted => "Not Shortlisted",
        }
    }
}

/// Outcome of the three criteria for one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShortlistDecision {
    pub criteria: Vec<CriterionResult>,
}

impl ShortlistDecision {
    pub fn status(&self) -> ShortlistStatus {
        if self.criteria.iter().all(|result| result.met) {
            ShortlistStatus::Shortlisted
        } else {
            ShortlistStatus::NotShortlisted
        }
    }

    /// Reasons of the satisfied criteria on a pass, the first unmet criterion's message otherwise.
    pub fn reason(&self) -> String {
        match self.status() {
            ShortlistStatus::Shortlisted => self
                .criteria
                .iter()
                .flat_map(|result| result.reasons.iter().map(String::as_str))
                .collect::<Vec<_>>()
                .join("; "),
            ShortlistStatus::NotShortlisted => self
                .criteria
                .iter()
                .find(|result| !result.met)
                .map(|result| result.criterion.failure_message().to_string())
                .unwrap_or_default(),
        }
    }
}

/// Apply every criterion to `snapshot`.
pub fn evaluate(snapshot: &Snapshot, rules: &ShortlistRules) -> ShortlistDecision {
    ShortlistDecision {
        criteria: vec![
            rules::experience(snapshot, rules),
            rules::compensation(snapshot, rules),
            rules::location(snapshot, rules),
        ],
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "record_id", rename_all = "snake_case")]
pub enum LeadChange {
    Created(RecordId),
    Updated(RecordId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShortlistResult {
    pub status: ShortlistStatus,
    pub reason: String,
    pub lead: Option<LeadChange>,
}

#[derive(Debug, thiserror::Error)]
pub enum ShortlistError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Evaluates every applicant, records the status and maintains `Shortlisted Leads`.
pub struct ShortlistEvaluator<S> {
    store: Arc<S>,
    rules: ShortlistRules,
}

impl<S> ShortlistEvaluator<S>
where
    S: RecordStore + 'static,
{
    pub fn new(store: Arc<S>, rules: ShortlistRules) -> Self {
        Self { store, rules }
    }

    pub fn evaluate_all(&self) -> Result<BatchReport<ShortlistResult>, ShortlistError> {
        let mut report = BatchReport::default();

        for record in self.store.query(applicants::TABLE, &Filter::All)? {
            let applicant = ApplicantRef::from_record(&record);
            let outcome = match self.evaluate_record(&record) {
                Ok(Ok(result)) => {
                    info!(
                        applicant = %applicant,
                        status = result.status.label(),
                        reason = %result.reason,
                        "applicant evaluated"
                    );
                    BatchOutcome::Completed(result)
                }
                Ok(Err(reason)) => {
                    warn!(applicant = %applicant, %reason, "skipping applicant");
                    BatchOutcome::Skipped(reason)
                }
                Err(err) => {
                    warn!(applicant = %applicant, error = %err, "shortlist evaluation failed");
                    BatchOutcome::Failed(err.to_string())
                }
            };
            report.push(applicant, outcome);
        }

        Ok(report)
    }

    fn evaluate_record(
        &self,
        record: &Record,
    ) -> Result<Result<ShortlistResult, SkipReason>, ShortlistError> {
        let (raw, snapshot) = match read_snapshot(record) {
            Ok(parsed) => parsed,
            Err(reason) => return Ok(Err(reason)),
        };

        let decision = evaluate(&snapshot, &self.rules);
        let status = decision.status();
        let reason = decision.reason();

        let mut fields = Fields::new();
        fields.insert(
            applicants::SHORTLIST_STATUS.to_string(),
            Value::String(status.label().to_string()),
        );
        self.store.update(applicants::TABLE, &record.id, fields)?;

        let lead = match status {
            ShortlistStatus::Shortlisted => Some(self.upsert_lead(&record.id, raw, &reason)?),
            ShortlistStatus::NotShortlisted => None,
        };

        Ok(Ok(ShortlistResult {
            status,
            reason,
            lead,
        }))
    }

    fn upsert_lead(
        &self,
        applicant: &RecordId,
        raw: &str,
        reason: &str,
    ) -> Result<LeadChange, StoreError> {
        let mut fields = Fields::new();
        fields.insert(leads::COMPRESSED_JSON.to_string(), json!(raw));
        fields.insert(leads::SCORE_REASON.to_string(), json!(reason));

        let existing = self
            .store
            .query(leads::TABLE, &Filter::links_to(leads::APPLICANT_LINK, applicant))?;
        match existing.first() {
            Some(lead) => {
                self.store.update(leads::TABLE, &lead.id, fields)?;
                Ok(LeadChange::Updated(lead.id.clone()))
            }
            None => {
                fields.insert(
                    leads::APPLICANT_LINK.to_string(),
                    json!([applicant.as_str()]),
                );
                let created = self.store.create(leads::TABLE, fields)?;
                Ok(LeadChange::Created(created.id))
            }
        }
    }
}
