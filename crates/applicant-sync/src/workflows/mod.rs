pub mod compress;
pub mod enrichment;
pub mod reconcile;
pub mod shortlist;
pub mod snapshot;

use std::fmt;

use serde::Serialize;

use crate::store::tables::applicants;
use crate::store::{Record, RecordId};
use snapshot::Snapshot;

/// Identity of an applicant as shown in reports: store id plus the external `Applicant ID`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicantRef {
    pub record_id: RecordId,
    pub applicant_id: Option<String>,
}

impl ApplicantRef {
    pub fn from_record(record: &Record) -> Self {
        Self {
            record_id: record.id.clone(),
            applicant_id: record.text(applicants::APPLICANT_ID).map(str::to_string),
        }
    }
}

impl fmt::Display for ApplicantRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.applicant_id {
            Some(applicant_id) => write!(f, "{applicant_id} ({})", self.record_id),
            None => write!(f, "{}", self.record_id),
        }
    }
}

/// Why a batch step left an applicant untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    MissingSnapshot,
    MalformedSnapshot(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingSnapshot => f.write_str("no Compressed JSON found"),
            SkipReason::MalformedSnapshot(detail) => write!(f, "invalid JSON format ({detail})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "result", rename_all = "snake_case")]
pub enum BatchOutcome<T> {
    Completed(T),
    Skipped(SkipReason),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchEntry<T> {
    pub applicant: ApplicantRef,
    pub outcome: BatchOutcome<T>,
}

/// Per-applicant results of a batch run, in processing order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport<T> {
    pub entries: Vec<BatchEntry<T>>,
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> BatchReport<T> {
    pub(crate) fn push(&mut self, applicant: ApplicantRef, outcome: BatchOutcome<T>) {
        self.entries.push(BatchEntry { applicant, outcome });
    }

    pub fn skipped(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.outcome, BatchOutcome::Skipped(_)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.outcome, BatchOutcome::Failed(_)))
            .count()
    }

    pub fn outcome_for(&self, record_id: &RecordId) -> Option<&BatchOutcome<T>> {
        self.entries
            .iter()
            .find(|entry| &entry.applicant.record_id == record_id)
            .map(|entry| &entry.outcome)
    }
}

/// Raw `Compressed JSON` text of an applicant together with its parsed form.
pub(crate) fn read_snapshot(record: &Record) -> Result<(&str, Snapshot), SkipReason> {
    let raw = record
        .text(applicants::COMPRESSED_JSON)
        .filter(|raw| !raw.trim().is_empty())
        .ok_or(SkipReason::MissingSnapshot)?;
    let snapshot =
        Snapshot::parse(raw).map_err(|err| SkipReason::MalformedSnapshot(err.to_string()))?;
    Ok((raw, snapshot))
}
