use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::SnapshotError;
use crate::store::tables::{personal, salary, work};
use crate::store::{Fields, Record};

/// Snapshot key to store field translation for one normalized table.
pub(crate) struct FieldMap {
    pub(crate) table: &'static str,
    pub(crate) link: &'static str,
    pairs: &'static [(&'static str, &'static str)],
}

pub(crate) const PERSONAL: FieldMap = FieldMap {
    table: personal::TABLE,
    link: personal::APPLICANT_LINK,
    pairs: &[
        ("name", personal::FULL_NAME),
        ("email", personal::EMAIL),
        ("location", personal::LOCATION),
        ("linkedin", personal::LINKEDIN),
    ],
};

pub(crate) const EXPERIENCE: FieldMap = FieldMap {
    table: work::TABLE,
    link: work::APPLICANT_LINK,
    pairs: &[
        ("company", work::COMPANY),
        ("title", work::TITLE),
        ("start", work::START_DATE),
        ("end", work::END_DATE),
        ("technologies", work::TECHNOLOGIES),
    ],
};

pub(crate) const SALARY: FieldMap = FieldMap {
    table: salary::TABLE,
    link: salary::APPLICANT_LINK,
    pairs: &[
        ("preferred_rate", salary::PREFERRED_RATE),
        ("min_rate", salary::MINIMUM_RATE),
        ("currency", salary::CURRENCY),
        ("availability", salary::AVAILABILITY),
    ],
};

impl FieldMap {
    /// Build a snapshot section from a stored row; missing fields read as `""`.
    pub(crate) fn section_from_record<T: DeserializeOwned>(
        &self,
        record: &Record,
    ) -> Result<T, SnapshotError> {
        let mut section = Map::new();
        for (key, field) in self.pairs {
            let value = record
                .field(field)
                .cloned()
                .unwrap_or_else(|| Value::String(String::new()));
            section.insert((*key).to_string(), value);
        }
        serde_json::from_value(Value::Object(section)).map_err(SnapshotError::Malformed)
    }

    /// Store fields for a snapshot section. Empty strings become `null` so typed
    /// columns are cleared rather than rejected.
    pub(crate) fn fields_from_section<T: Serialize>(
        &self,
        section: &T,
    ) -> Result<Fields, SnapshotError> {
        let value = serde_json::to_value(section).map_err(SnapshotError::Encode)?;
        let mut fields = Fields::new();
        for (key, field) in self.pairs {
            let value = value.get(*key).cloned().unwrap_or(Value::Null);
            fields.insert((*field).to_string(), store_value(value));
        }
        Ok(fields)
    }
}

fn store_value(value: Value) -> Value {
    match value {
        Value::String(text) if text.is_empty() => Value::Null,
        other => other,
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        _ => false,
    }
}

/// Whether writing `fields` would change anything on `record`.
pub(crate) fn differs(record: &Record, fields: &Fields) -> bool {
    fields.iter().any(|(name, desired)| {
        let current = record.fields.get(name);
        if is_blank(current) && is_blank(Some(desired)) {
            return false;
        }
        current != Some(desired)
    })
}
