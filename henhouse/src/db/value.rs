//! Native document values
//!
//! The store keeps temporal values as [`FieldValue::Timestamp`]. They leave
//! the store layer only through [`Document::to_json`], which renders them as
//! ISO-8601 strings.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

use crate::db::store::{DocumentPath, StoreError};

/// Field name to value, ordered for stable output.
pub type Fields = BTreeMap<String, FieldValue>;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    /// Replaced with the store's clock when the write is applied
    ServerTimestamp,
    Array(Vec<FieldValue>),
    Map(Fields),
}

impl FieldValue {
    /// Convert a JSON value. Strings stay strings; nothing is guessed to be
    /// a timestamp.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                None => FieldValue::Double(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => FieldValue::String(s),
            Value::Array(items) => {
                FieldValue::Array(items.into_iter().map(FieldValue::from_json).collect())
            }
            Value::Object(map) => FieldValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, FieldValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Render as JSON, timestamps as ISO-8601 strings.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null | FieldValue::ServerTimestamp => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Integer(i) => Value::Number((*i).into()),
            FieldValue::Double(d) => Number::from_f64(*d).map(Value::Number).unwrap_or(Value::Null),
            FieldValue::String(s) => Value::String(s.clone()),
            FieldValue::Timestamp(ts) => Value::String(iso8601(ts)),
            FieldValue::Array(items) => Value::Array(items.iter().map(FieldValue::to_json).collect()),
            FieldValue::Map(fields) => Value::Object(fields_to_json(fields)),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Replace every server-timestamp sentinel with `now`.
    pub fn resolve_server_timestamps(&mut self, now: DateTime<Utc>) {
        match self {
            FieldValue::ServerTimestamp => *self = FieldValue::Timestamp(now),
            FieldValue::Array(items) => items
                .iter_mut()
                .for_each(|item| item.resolve_server_timestamps(now)),
            FieldValue::Map(fields) => resolve_fields(fields, now),
            _ => {}
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(value)
    }
}

/// Millisecond precision, `Z` suffix.
pub fn iso8601(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Convert a JSON object into document fields.
pub fn fields_from_json(value: Value) -> Result<Fields, StoreError> {
    match value {
        Value::Object(map) => Ok(map
            .into_iter()
            .map(|(k, v)| (k, FieldValue::from_json(v)))
            .collect()),
        other => Err(StoreError::InvalidData(format!(
            "document data must be an object, got {}",
            other
        ))),
    }
}

pub fn fields_to_json(fields: &Fields) -> Map<String, Value> {
    fields.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()
}

pub fn resolve_fields(fields: &mut Fields, now: DateTime<Utc>) {
    fields
        .values_mut()
        .for_each(|value| value.resolve_server_timestamps(now));
}

/// A stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: DocumentPath,
    pub fields: Fields,
}

impl Document {
    pub fn id(&self) -> &str {
        &self.path.id
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// The document's fields as JSON, timestamps normalized.
    pub fn to_json(&self) -> Value {
        Value::Object(fields_to_json(&self.fields))
    }

    /// Like [`Document::to_json`], with the document id under `id`.
    pub fn to_json_with_id(&self) -> Value {
        let mut map = fields_to_json(&self.fields);
        map.insert("id".to_string(), Value::String(self.path.id.clone()));
        Value::Object(map)
    }
}
