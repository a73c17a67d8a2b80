use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use super::{Fields, Filter, Record, RecordId, RecordStore, StoreError};

/// Mutation recorded by [`MemoryStore`]; seeding through [`MemoryStore::insert`] is not journaled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub kind: OperationKind,
    pub table: String,
    pub id: RecordId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

#[derive(Default)]
struct State {
    tables: BTreeMap<String, Vec<Record>>,
    journal: Vec<Operation>,
    read_only: BTreeSet<String>,
    sequence: u64,
}

impl State {
    fn next_id(&mut self) -> RecordId {
        self.sequence += 1;
        RecordId(format!("rec{:06}", self.sequence))
    }

    fn guard_writable(&self, table: &str) -> Result<(), StoreError> {
        if self.read_only.contains(table) {
            return Err(StoreError::Unavailable(format!("{table} is read only")));
        }
        Ok(())
    }
}

/// In-process store keeping rows in insertion order, so "first match" is stable.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Seed a row without recording an operation.
    pub fn insert(&self, table: &str, fields: Fields) -> RecordId {
        let mut state = self.lock();
        let id = state.next_id();
        state
            .tables
            .entry(table.to_string())
            .or_default()
            .push(Record {
                id: id.clone(),
                fields,
            });
        id
    }

    /// All rows of a table in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Record> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    pub fn operations(&self) -> Vec<Operation> {
        self.lock().journal.clone()
    }

    pub fn count(&self, kind: OperationKind, table: &str) -> usize {
        self.lock()
            .journal
            .iter()
            .filter(|op| op.kind == kind && op.table == table)
            .count()
    }

    pub fn clear_operations(&self) {
        self.lock().journal.clear();
    }

    /// Make every write to `table` fail with [`StoreError::Unavailable`].
    pub fn set_read_only(&self, table: &str) {
        self.lock().read_only.insert(table.to_string());
    }
}

impl RecordStore for MemoryStore {
    fn query(&self, table: &str, filter: &Filter) -> Result<Vec<Record>, StoreError> {
        let state = self.lock();
        Ok(state
            .tables
            .get(table)
            .map(|rows| rows.iter().filter(|row| filter.matches(row)).cloned().collect())
            .unwrap_or_default())
    }

    fn get(&self, table: &str, id: &RecordId) -> Result<Option<Record>, StoreError> {
        let state = self.lock();
        Ok(state
            .tables
            .get(table)
            .and_then(|rows| rows.iter().find(|row| &row.id == id).cloned()))
    }

    fn create(&self, table: &str, fields: Fields) -> Result<Record, StoreError> {
        let mut state = self.lock();
        state.guard_writable(table)?;
        let id = state.next_id();
        let fields = fields.into_iter().filter(|(_, value)| !value.is_null()).collect();
        let record = Record {
            id: id.clone(),
            fields,
        };
        state
            .tables
            .entry(table.to_string())
            .or_default()
            .push(record.clone());
        state.journal.push(Operation {
            kind: OperationKind::Create,
            table: table.to_string(),
            id,
        });
        Ok(record)
    }

    fn update(&self, table: &str, id: &RecordId, fields: Fields) -> Result<Record, StoreError> {
        let mut state = self.lock();
        state.guard_writable(table)?;
        let row = state
            .tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|row| &row.id == id))
            .ok_or_else(|| StoreError::NotFound {
                table: table.to_string(),
                id: id.clone(),
            })?;
        for (name, value) in fields {
            if value.is_null() {
                row.fields.remove(&name);
            } else {
                row.fields.insert(name, value);
            }
        }
        let updated = row.clone();
        state.journal.push(Operation {
            kind: OperationKind::Update,
            table: table.to_string(),
            id: id.clone(),
        });
        Ok(updated)
    }

    fn delete(&self, table: &str, id: &RecordId) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.guard_writable(table)?;
        let rows = state.tables.get_mut(table).ok_or_else(|| StoreError::NotFound {
            table: table.to_string(),
            id: id.clone(),
        })?;
        let before = rows.len();
        rows.retain(|row| &row.id != id);
        if rows.len() == before {
            return Err(StoreError::NotFound {
                table: table.to_string(),
                id: id.clone(),
            });
        }
        state.journal.push(Operation {
            kind: OperationKind::Delete,
            table: table.to_string(),
            id: id.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().expect("object fields")
    }

    #[test]
    fn update_merges_and_clears_null_fields() {
        let store = MemoryStore::new();
        let id = store.insert("T", fields(json!({ "A": "1", "B": "2" })));

        let updated = store
            .update("T", &id, fields(json!({ "B": null, "C": 3 })))
            .expect("update succeeds");

        assert_eq!(updated.fields, fields(json!({ "A": "1", "C": 3 })));
        assert_eq!(store.count(OperationKind::Update, "T"), 1);
    }

    #[test]
    fn seeded_rows_are_not_journaled() {
        let store = MemoryStore::new();
        store.insert("T", Fields::new());
        store.create("T", Fields::new()).expect("create succeeds");
        assert_eq!(store.operations().len(), 1);
        assert_eq!(store.rows("T").len(), 2);
    }

    #[test]
    fn delete_of_unknown_record_is_not_found() {
        let store = MemoryStore::new();
        store.insert("T", Fields::new());
        match store.delete("T", &RecordId::from("recnope")) {
            Err(StoreError::NotFound { .. }) => {}
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[test]
    fn read_only_tables_reject_writes() {
        let store = MemoryStore::new();
        store.set_read_only("T");
        assert!(matches!(
            store.create("T", Fields::new()),
            Err(StoreError::Unavailable(_))
        ));
        assert!(store.query("T", &Filter::All).expect("reads allowed").is_empty());
    }
}
