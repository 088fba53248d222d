//! TTL envelopes
//!
//! A value stored with a TTL is wrapped as
//! `{"value": <value>, "expiry": <epoch ms>, "__isTTL": true}`.
//! A stored object only counts as an envelope when all three fields are present
//! and the marker is exactly `true`, so ordinary objects that happen to carry a
//! `value` field are left alone.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const VALUE_FIELD: &str = "value";
pub const EXPIRY_FIELD: &str = "expiry";
pub const TTL_MARKER: &str = "__isTTL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtlEnvelope<T> {
    pub value: T,
    /// Absolute expiry in epoch milliseconds
    pub expiry: i64,
    #[serde(rename = "__isTTL")]
    pub is_ttl: bool,
}

impl<T> TtlEnvelope<T> {
    pub fn new(value: T, expiry: i64) -> Self {
        Self {
            value,
            expiry,
            is_ttl: true,
        }
    }

    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms > self.expiry
    }
}

/// Absent, `null`, `false`, zero and the empty string are falsy and never unwrapped
pub fn is_falsy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => !b,
        Some(Value::Number(n)) => n.as_f64().map_or(false, |f| f == 0.0),
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => false,
    }
}

pub fn is_envelope(value: &Value) -> bool {
    value.as_object().map_or(false, is_envelope_map)
}

fn is_envelope_map(map: &Map<String, Value>) -> bool {
    map.contains_key(VALUE_FIELD)
        && map.contains_key(EXPIRY_FIELD)
        && map.get(TTL_MARKER) == Some(&Value::Bool(true))
}

/// Strip a TTL envelope so subscribers only ever see the semantic value
pub fn unwrap_value(value: Option<Value>) -> Option<Value> {
    if is_falsy(value.as_ref()) {
        return value;
    }

    match value {
        Some(Value::Object(mut map)) if is_envelope_map(&map) => map.remove(VALUE_FIELD),
        other => other,
    }
}
