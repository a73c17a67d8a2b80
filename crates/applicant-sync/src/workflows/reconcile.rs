use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use super::snapshot::mapping::{differs, FieldMap, EXPERIENCE, PERSONAL, SALARY};
use super::snapshot::{ExperienceEntry, ExperienceKey, Snapshot, SnapshotError};
use super::{read_snapshot, ApplicantRef, BatchOutcome, BatchReport};
use crate::store::tables::applicants;
use crate::store::{Filter, Record, RecordId, RecordStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// What happened to a 1:1 child row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionChange {
    Updated,
    Unchanged,
    /// Snapshot has the section but no linked row exists; rows are never created.
    NoRow,
    /// Snapshot section is empty.
    NotInSnapshot,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExperienceChanges {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    pub personal: SectionChange,
    pub experience: ExperienceChanges,
    pub salary: SectionChange,
}

impl ReconcileStats {
    /// Number of store writes issued.
    pub fn writes(&self) -> usize {
        let section = |change: SectionChange| usize::from(change == SectionChange::Updated);
        section(self.personal)
            + section(self.salary)
            + self.experience.created
            + self.experience.updated
            + self.experience.deleted
    }
}

/// Pushes each applicant's `Compressed JSON` back into the normalized child tables.
pub struct SnapshotReconciler<S> {
    store: Arc<S>,
}

impl<S> SnapshotReconciler<S>
where
    S: RecordStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Reconcile every applicant. Per-applicant problems are reported, not raised;
    /// only a failure to list the applicants table aborts the batch.
    pub fn reconcile_all(&self) -> Result<BatchReport<ReconcileStats>, ReconcileError> {
        let mut report = BatchReport::default();

        for record in self.store.query(applicants::TABLE, &Filter::All)? {
            let applicant = ApplicantRef::from_record(&record);
            let outcome = match read_snapshot(&record) {
                Err(reason) => {
                    warn!(applicant = %applicant, %reason, "skipping applicant");
                    BatchOutcome::Skipped(reason)
                }
                Ok((_, snapshot)) => match self.reconcile_applicant(&record.id, &snapshot) {
                    Ok(stats) => {
                        info!(
                            applicant = %applicant,
                            writes = stats.writes(),
                            created = stats.experience.created,
                            deleted = stats.experience.deleted,
                            "applicant reconciled"
                        );
                        BatchOutcome::Completed(stats)
                    }
                    Err(err) => {
                        warn!(applicant = %applicant, error = %err, "reconcile failed");
                        BatchOutcome::Failed(err.to_string())
                    }
                },
            };
            report.push(applicant, outcome);
        }

        Ok(report)
    }

    /// Make the child rows of one applicant agree with `snapshot`.
    pub fn reconcile_applicant(
        &self,
        applicant: &RecordId,
        snapshot: &Snapshot,
    ) -> Result<ReconcileStats, ReconcileError> {
        let personal = self.sync_section(&PERSONAL, applicant, snapshot.personal.as_ref())?;
        let experience = self.sync_experience(applicant, &snapshot.experience)?;
        let salary = self.sync_section(&SALARY, applicant, snapshot.salary.as_ref())?;

        Ok(ReconcileStats {
            personal,
            experience,
            salary,
        })
    }

    fn sync_section<T: Serialize>(
        &self,
        map: &FieldMap,
        applicant: &RecordId,
        section: Option<&T>,
    ) -> Result<SectionChange, ReconcileError> {
        let Some(section) = section else {
            return Ok(SectionChange::NotInSnapshot);
        };

        let rows = self
            .store
            .query(map.table, &Filter::links_to(map.link, applicant))?;
        let Some(row) = rows.first() else {
            return Ok(SectionChange::NoRow);
        };

        let fields = map.fields_from_section(section)?;
        if !differs(row, &fields) {
            return Ok(SectionChange::Unchanged);
        }
        self.store.update(map.table, &row.id, fields)?;
        Ok(SectionChange::Updated)
    }

    fn sync_experience(
        &self,
        applicant: &RecordId,
        entries: &[ExperienceEntry],
    ) -> Result<ExperienceChanges, ReconcileError> {
        let rows = self
            .store
            .query(EXPERIENCE.table, &Filter::links_to(EXPERIENCE.link, applicant))?;

        // Later rows sharing a key with an earlier one are duplicates and get removed.
        let mut lookup: HashMap<ExperienceKey, Record> = HashMap::new();
        let mut stale = Vec::new();
        for row in rows {
            let key = EXPERIENCE.section_from_record::<ExperienceEntry>(&row)?.key();
            if lookup.contains_key(&key) {
                stale.push(row);
            } else {
                lookup.insert(key, row);
            }
        }

        let mut changes = ExperienceChanges::default();
        let mut seen = HashSet::new();
        for entry in entries {
            let key = entry.key();
            if !seen.insert(key.clone()) {
                warn!(
                    applicant = %applicant,
                    company = %key.company,
                    title = %key.title,
                    "duplicate experience entry ignored"
                );
                continue;
            }

            let mut fields = EXPERIENCE.fields_from_section(entry)?;
            match lookup.remove(&key) {
                Some(row) => {
                    if differs(&row, &fields) {
                        self.store.update(EXPERIENCE.table, &row.id, fields)?;
                        changes.updated += 1;
                    } else {
                        changes.unchanged += 1;
                    }
                }
                None => {
                    fields.retain(|_, value| !value.is_null());
                    fields.insert(EXPERIENCE.link.to_string(), json!([applicant.as_str()]));
                    self.store.create(EXPERIENCE.table, fields)?;
                    changes.created += 1;
                }
            }
        }

        stale.extend(lookup.into_values());
        stale.sort_by(|a, b| a.id.cmp(&b.id));
        for row in stale {
            self.store.delete(EXPERIENCE.table, &row.id)?;
            changes.deleted += 1;
        }

        Ok(changes)
    }
}
