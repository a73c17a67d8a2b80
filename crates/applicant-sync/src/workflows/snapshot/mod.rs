//! Denormalized applicant document stored in `Compressed JSON`.
//!
//! The serialized form is a JSON object with exactly the keys `personal`,
//! `experience` and `salary`, in that order. Absent 1:1 sections serialize as
//! `{}`. Text fields accept any JSON scalar and read `null` as `""`; rates,
//! availability and technologies keep the JSON value the store produced.

pub(crate) mod mapping;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default, with = "optional_section")]
    pub personal: Option<PersonalSection>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default, with = "optional_section")]
    pub salary: Option<SalarySection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalSection {
    #[serde(default, deserialize_with = "text")]
    pub name: String,
    #[serde(default, deserialize_with = "text")]
    pub email: String,
    #[serde(default, deserialize_with = "text")]
    pub location: String,
    #[serde(default, deserialize_with = "text")]
    pub linkedin: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    #[serde(default, deserialize_with = "text")]
    pub company: String,
    #[serde(default, deserialize_with = "text")]
    pub title: String,
    #[serde(default, deserialize_with = "text")]
    pub start: String,
    #[serde(default, deserialize_with = "text")]
    pub end: String,
    #[serde(default = "empty_text")]
    pub technologies: Value,
}

impl ExperienceEntry {
    pub fn key(&self) -> ExperienceKey {
        ExperienceKey {
            company: self.company.clone(),
            title: self.title.clone(),
        }
    }
}

/// Natural key of a work experience row. Two stints with the same key collapse into one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExperienceKey {
    pub company: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalarySection {
    #[serde(default = "empty_text")]
    pub preferred_rate: Value,
    #[serde(default = "empty_text")]
    pub min_rate: Value,
    #[serde(default, deserialize_with = "text")]
    pub currency: String,
    #[serde(default = "empty_text")]
    pub availability: Value,
}

impl SalarySection {
    pub fn preferred_rate(&self) -> Option<f64> {
        number(&self.preferred_rate)
    }

    pub fn min_rate(&self) -> Option<f64> {
        number(&self.min_rate)
    }

    pub fn availability(&self) -> Option<f64> {
        number(&self.availability)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("invalid snapshot JSON: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("could not encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),
}

impl Snapshot {
    pub fn parse(raw: &str) -> Result<Self, SnapshotError> {
        serde_json::from_str(raw).map_err(SnapshotError::Malformed)
    }

    /// Compact JSON text in the canonical key order.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string(self).map_err(SnapshotError::Encode)
    }

    pub fn to_pretty_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self).map_err(SnapshotError::Encode)
    }
}

/// Hex SHA-256 of the raw snapshot text, used to detect changes between enrichment runs.
pub fn snapshot_hash(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Numeric reading of a loosely typed value. Blank or non-numeric values are `None`.
pub fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Render a loosely typed value as text: lists are comma-joined, `null` is empty.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(value_text)
            .filter(|item| !item.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

fn empty_text() -> Value {
    Value::String(String::new())
}

fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_text(&value))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

mod optional_section {
    use super::*;
    use serde::de::Error as _;

    pub fn serialize<S, T>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        match value {
            Some(section) => section.serialize(serializer),
            None => Map::new().serialize(serializer),
        }
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        match Option::<Map<String, Value>>::deserialize(deserializer)? {
            Some(map) if !map.is_empty() => serde_json::from_value(Value::Object(map))
                .map(Some)
                .map_err(D::Error::custom),
            _ => Ok(None),
        }
    }
}
