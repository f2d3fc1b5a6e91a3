//! Document and field value types shared by every store backend.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::error::AppError;

/// Field name to value map of a single document.
pub type Fields = BTreeMap<String, FieldValue>;

/// A document field value.
///
/// Mirrors the value kinds a document store distinguishes. `Timestamp` only
/// appears after date normalization or when read back from the target store;
/// source rows carry dates as plain strings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    Array(Vec<FieldValue>),
    Map(Fields),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Renders scalar keys (strings and integers) as a document id.
    pub fn as_key(&self) -> Option<String> {
        match self {
            FieldValue::String(s) if !s.is_empty() => Some(s.clone()),
            FieldValue::Integer(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Converts back to JSON; timestamps become RFC 3339 strings.
    pub fn to_json(&self) -> JsonValue {
        match self {
            FieldValue::Null => JsonValue::Null,
            FieldValue::Boolean(b) => JsonValue::Bool(*b),
            FieldValue::Integer(n) => JsonValue::from(*n),
            FieldValue::Double(d) => JsonValue::from(*d),
            FieldValue::String(s) => JsonValue::String(s.clone()),
            FieldValue::Timestamp(ts) => JsonValue::String(ts.to_rfc3339()),
            FieldValue::Array(values) => {
                JsonValue::Array(values.iter().map(FieldValue::to_json).collect())
            }
            FieldValue::Map(fields) => fields_to_json(fields),
        }
    }
}

impl From<JsonValue> for FieldValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => FieldValue::Null,
            JsonValue::Bool(b) => FieldValue::Boolean(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                None => FieldValue::Double(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => FieldValue::String(s),
            JsonValue::Array(values) => {
                FieldValue::Array(values.into_iter().map(FieldValue::from).collect())
            }
            JsonValue::Object(map) => FieldValue::Map(fields_from_json(map)),
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

pub fn fields_from_json(map: JsonMap<String, JsonValue>) -> Fields {
    map.into_iter()
        .map(|(k, v)| (k, FieldValue::from(v)))
        .collect()
}

pub fn fields_to_json(fields: &Fields) -> JsonValue {
    JsonValue::Object(
        fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
}

/// A document: an id unique within its collection plus its fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Builds a document from a JSON object; any other JSON shape is rejected.
    pub fn from_json(id: impl Into<String>, value: JsonValue) -> Result<Self, AppError> {
        match value {
            JsonValue::Object(map) => Ok(Self::new(id, fields_from_json(map))),
            other => Err(AppError::Codec(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_str)
    }

    pub fn to_json(&self) -> JsonValue {
        fields_to_json(&self.fields)
    }

    /// Decodes the fields into a typed record.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        serde_json::from_value(self.to_json())
            .map_err(|e| AppError::Codec(format!("document '{}': {}", self.id, e)))
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
