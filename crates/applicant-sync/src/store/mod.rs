//! Table-oriented record storage used by every workflow.
//!
//! The workflows only ever see [`RecordStore`]; Airtable is the production
//! backend and [`MemoryStore`] backs tests and local dry runs.

mod airtable;
mod memory;
pub mod tables;

pub use airtable::{AirtableStore, BaseSchema, FieldSchema, TableSchema, ViewSchema};
pub use memory::{MemoryStore, Operation, OperationKind};

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field name to value mapping of a single record.
pub type Fields = Map<String, Value>;

/// Opaque identifier assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A row as returned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(default)]
    pub fields: Fields,
}

impl Record {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).filter(|value| !value.is_null())
    }

    /// String value of a field; `None` for missing or non-string values.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }

    /// Whether a link field (list of record ids) references `target`.
    pub fn links_to(&self, name: &str, target: &RecordId) -> bool {
        match self.field(name) {
            Some(Value::Array(items)) => items
                .iter()
                .any(|item| item.as_str() == Some(target.as_str())),
            Some(Value::String(single)) => single == target.as_str(),
            _ => false,
        }
    }
}

/// Row selection for [`RecordStore::query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    All,
    /// Field equals the given text.
    Eq { field: String, value: String },
    /// Link field contains the given record id.
    LinksTo { field: String, record_id: RecordId },
}

impl Filter {
    pub fn eq(field: &str, value: &str) -> Self {
        Self::Eq {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    pub fn links_to(field: &str, record_id: &RecordId) -> Self {
        Self::LinksTo {
            field: field.to_string(),
            record_id: record_id.clone(),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq { field, value } => match record.field(field) {
                Some(Value::String(text)) => text == value,
                Some(Value::Number(number)) => number.to_string() == *value,
                Some(Value::Array(items)) => items.iter().any(|item| item.as_str() == Some(value)),
                _ => false,
            },
            Filter::LinksTo { field, record_id } => record.links_to(field, record_id),
        }
    }
}

/// CRUD surface over named tables.
///
/// `update` merges the given fields into the record; a `null` value clears a field.
pub trait RecordStore: Send + Sync {
    fn query(&self, table: &str, filter: &Filter) -> Result<Vec<Record>, StoreError>;
    fn get(&self, table: &str, id: &RecordId) -> Result<Option<Record>, StoreError>;
    fn create(&self, table: &str, fields: Fields) -> Result<Record, StoreError>;
    fn update(&self, table: &str, id: &RecordId, fields: Fields) -> Result<Record, StoreError>;
    fn delete(&self, table: &str, id: &RecordId) -> Result<(), StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record {id} not found in {table}")]
    NotFound { table: String, id: RecordId },
    #[error("store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("unexpected store payload: {0}")]
    Payload(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StoreError::Payload(err.to_string())
        } else {
            StoreError::Unavailable(err.to_string())
        }
    }
}
