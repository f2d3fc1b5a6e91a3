//! Firestore REST value encoding.
//!
//! Firestore's JSON API wraps every value in a single-key object naming its
//! type (`{"stringValue": "x"}`, `{"integerValue": "42"}`, ...). Integers are
//! carried as decimal strings; timestamps as RFC 3339 in UTC.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map as JsonMap, Value as JsonValue};

use crate::error::AppError;
use crate::store::{Document, FieldValue, Fields};

pub fn encode_value(value: &FieldValue) -> JsonValue {
    match value {
        FieldValue::Null => json!({ "nullValue": null }),
        FieldValue::Boolean(b) => json!({ "booleanValue": b }),
        FieldValue::Integer(n) => json!({ "integerValue": n.to_string() }),
        FieldValue::Double(d) if d.is_nan() => json!({ "doubleValue": "NaN" }),
        FieldValue::Double(d) if d.is_infinite() => {
            let s = if d.is_sign_positive() { "Infinity" } else { "-Infinity" };
            json!({ "doubleValue": s })
        }
        FieldValue::Double(d) => json!({ "doubleValue": d }),
        FieldValue::String(s) => json!({ "stringValue": s }),
        FieldValue::Timestamp(ts) => {
            json!({ "timestampValue": ts.to_rfc3339_opts(SecondsFormat::AutoSi, true) })
        }
        FieldValue::Array(values) if values.is_empty() => json!({ "arrayValue": {} }),
        FieldValue::Array(values) => {
            let values: Vec<JsonValue> = values.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        FieldValue::Map(fields) => json!({ "mapValue": { "fields": encode_fields(fields) } }),
    }
}

pub fn encode_fields(fields: &Fields) -> JsonValue {
    JsonValue::Object(
        fields
            .iter()
            .map(|(k, v)| (k.clone(), encode_value(v)))
            .collect(),
    )
}

pub fn decode_value(raw: &JsonValue) -> Result<FieldValue, AppError> {
    let obj = raw
        .as_object()
        .filter(|o| o.len() == 1)
        .ok_or_else(|| AppError::Codec(format!("expected a typed value, got {}", raw)))?;
    let (kind, inner) = obj
        .iter()
        .next()
        .ok_or_else(|| AppError::Codec("empty typed value".to_string()))?;

    let value = match kind.as_str() {
        "nullValue" => FieldValue::Null,
        "booleanValue" => {
            FieldValue::Boolean(inner.as_bool().ok_or_else(|| bad_value(kind, inner))?)
        }
        "integerValue" => {
            FieldValue::Integer(decode_integer(inner).ok_or_else(|| bad_value(kind, inner))?)
        }
        "doubleValue" => {
            FieldValue::Double(decode_double(inner).ok_or_else(|| bad_value(kind, inner))?)
        }
        "stringValue" | "referenceValue" | "bytesValue" => FieldValue::String(
            inner
                .as_str()
                .ok_or_else(|| bad_value(kind, inner))?
                .to_string(),
        ),
        "timestampValue" => {
            let s = inner.as_str().ok_or_else(|| bad_value(kind, inner))?;
            let ts = DateTime::parse_from_rfc3339(s).map_err(|_| bad_value(kind, inner))?;
            FieldValue::Timestamp(ts.with_timezone(&Utc))
        }
        "geoPointValue" => {
            let mut point = Fields::new();
            for axis in ["latitude", "longitude"] {
                let v = inner
                    .get(axis)
                    .and_then(JsonValue::as_f64)
                    .ok_or_else(|| bad_value(kind, inner))?;
                point.insert(axis.to_string(), FieldValue::Double(v));
            }
            FieldValue::Map(point)
        }
        "arrayValue" => {
            let values = match inner.get("values") {
                Some(JsonValue::Array(values)) => values
                    .iter()
                    .map(decode_value)
                    .collect::<Result<Vec<_>, _>>()?,
                Some(_) => return Err(bad_value(kind, inner)),
                None => Vec::new(),
            };
            FieldValue::Array(values)
        }
        "mapValue" => FieldValue::Map(match inner.get("fields") {
            Some(JsonValue::Object(fields)) => decode_fields(fields)?,
            Some(_) => return Err(bad_value(kind, inner)),
            None => Fields::new(),
        }),
        other => {
            return Err(AppError::Codec(format!("unknown value type '{}'", other)));
        }
    };
    Ok(value)
}

pub fn decode_fields(raw: &JsonMap<String, JsonValue>) -> Result<Fields, AppError> {
    raw.iter()
        .map(|(k, v)| Ok::<_, AppError>((k.clone(), decode_value(v)?)))
        .collect()
}

/// Decodes a REST `Document` resource; the id is the last segment of `name`.
pub fn decode_document(raw: &JsonValue) -> Result<Document, AppError> {
    let name = raw
        .get("name")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| AppError::Codec("document without a name".to_string()))?;
    let id = name
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Codec(format!("malformed document name '{}'", name)))?;

    let fields = match raw.get("fields") {
        Some(JsonValue::Object(fields)) => decode_fields(fields)?,
        Some(other) => {
            return Err(AppError::Codec(format!("document '{}' has fields {}", id, other)))
        }
        None => Fields::new(),
    };
    Ok(Document::new(id, fields))
}

/// Quotes a field path segment unless it is a plain identifier.
pub fn field_path(name: &str) -> String {
    let simple = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        name.to_string()
    } else {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

fn decode_integer(inner: &JsonValue) -> Option<i64> {
    match inner {
        JsonValue::String(s) => s.parse().ok(),
        JsonValue::Number(n) => n.as_i64(),
        _ => None,
    }
}

fn decode_double(inner: &JsonValue) -> Option<f64> {
    match inner {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => match s.as_str() {
            "NaN" => Some(f64::NAN),
            "Infinity" => Some(f64::INFINITY),
            "-Infinity" => Some(f64::NEG_INFINITY),
            _ => None,
        },
        _ => None,
    }
}

fn bad_value(kind: &str, inner: &JsonValue) -> AppError {
    AppError::Codec(format!("invalid {}: {}", kind, inner))
}
