//! Firestore REST typed-value codec
//!
//! Firestore's REST API wraps every value in a typed envelope
//! (`{"stringValue": "..."}`, `{"mapValue": {"fields": {...}}}`, ...).
//! Arrays may not directly contain arrays, so an inner array is wrapped in a
//! single-key map under [`NESTED_ARRAY_KEY`] and unwrapped again on decode.

use serde_json::{json, Map, Number, Value};

use crate::sanitize::Document;
use crate::{Error, Result};

/// Wrapper key for arrays nested inside arrays
pub const NESTED_ARRAY_KEY: &str = "__array";

/// Encode a document's fields
pub fn encode_fields(doc: &Document) -> Value {
    let fields: Map<String, Value> = doc
        .iter()
        .map(|(k, v)| (k.clone(), encode_value(v, false)))
        .collect();
    Value::Object(fields)
}

/// Decode the `fields` object of a Firestore document
pub fn decode_fields(fields: &Value) -> Result<Document> {
    match fields {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| Ok((k.clone(), decode_value(v)?)))
            .collect(),
        Value::Null => Ok(Document::new()),
        other => Err(Error::Internal(format!("Unexpected fields payload: {}", other))),
    }
}

fn encode_value(value: &Value, inside_array: bool) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or(0.0) }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(|v| encode_value(v, true)).collect();
            let array = if values.is_empty() {
                json!({ "arrayValue": {} })
            } else {
                json!({ "arrayValue": { "values": values } })
            };
            if inside_array {
                json!({ "mapValue": { "fields": { NESTED_ARRAY_KEY: array } } })
            } else {
                array
            }
        }
        Value::Object(map) => {
            let fields: Map<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), encode_value(v, false)))
                .collect();
            json!({ "mapValue": { "fields": fields } })
        }
    }
}

fn decode_value(value: &Value) -> Result<Value> {
    let obj = value
        .as_object()
        .ok_or_else(|| Error::Internal(format!("Untyped Firestore value: {}", value)))?;
    let (kind, inner) = obj
        .iter()
        .next()
        .ok_or_else(|| Error::Internal("Empty Firestore value".to_string()))?;

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => Ok(Value::Bool(inner.as_bool().unwrap_or(false))),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                Value::Number(n) => n.as_i64(),
                _ => None,
            };
            parsed
                .map(|i| Value::Number(i.into()))
                .ok_or_else(|| Error::Internal(format!("Bad integerValue: {}", inner)))
        }
        "doubleValue" => {
            let f = match inner {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.parse::<f64>().ok(),
                _ => None,
            };
            f.and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| Error::Internal(format!("Bad doubleValue: {}", inner)))
        }
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => {
            Ok(Value::String(inner.as_str().unwrap_or_default().to_string()))
        }
        "arrayValue" => {
            let items = inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect::<Result<Vec<_>>>())
                .transpose()?
                .unwrap_or_default();
            Ok(Value::Array(items))
        }
        "mapValue" => {
            let fields = decode_fields(inner.get("fields").unwrap_or(&Value::Null))?;
            if fields.len() == 1 {
                if let Some(Value::Array(items)) = fields.get(NESTED_ARRAY_KEY) {
                    return Ok(Value::Array(items.clone()));
                }
            }
            Ok(Value::Object(fields))
        }
        "geoPointValue" => Ok(inner.clone()),
        other => Err(Error::Internal(format!("Unsupported Firestore value type: {}", other))),
    }
}
