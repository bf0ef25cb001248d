//! Relaxed extended JSON rendering.
//!
//! Plain JSON types map directly; extended types use `$`-prefixed wrapper
//! objects (`{"$oid": "..."}`, `{"$date": "..."}`, ...).

use crate::document::{Bson, Document};
use base64::Engine;
use serde_json::{json, Map, Value};
use std::fmt;

/// Datetimes in this range render as ISO-8601 strings; others as
/// `$numberLong`.
const ISO_DATE_MIN_MILLIS: i64 = 0;
const ISO_DATE_MAX_MILLIS: i64 = 253_402_300_799_999; // 9999-12-31T23:59:59.999Z

impl Bson {
    /// Converts the value into relaxed extended JSON.
    pub fn into_relaxed_extjson(self) -> Value {
        match self {
            Bson::Double(v) if v.is_nan() => json!({ "$numberDouble": "NaN" }),
            Bson::Double(v) if v.is_infinite() => {
                let repr = if v > 0.0 { "Infinity" } else { "-Infinity" };
                json!({ "$numberDouble": repr })
            }
            Bson::Double(v) => json!(v),
            Bson::String(s) => Value::String(s),
            Bson::Document(d) => d.into_relaxed_extjson(),
            Bson::Array(items) => {
                Value::Array(items.into_iter().map(Bson::into_relaxed_extjson).collect())
            }
            Bson::Binary(bin) => json!({
                "$binary": {
                    "base64": base64::engine::general_purpose::STANDARD.encode(&bin.bytes),
                    "subType": format!("{:02x}", bin.subtype),
                }
            }),
            Bson::ObjectId(oid) => json!({ "$oid": oid.to_hex() }),
            Bson::Boolean(b) => Value::Bool(b),
            Bson::DateTime(dt) => {
                let millis = dt.timestamp_millis();
                if (ISO_DATE_MIN_MILLIS..=ISO_DATE_MAX_MILLIS).contains(&millis) {
                    json!({ "$date": dt.to_string() })
                } else {
                    json!({ "$date": { "$numberLong": millis.to_string() } })
                }
            }
            Bson::Null => Value::Null,
            Bson::Regex(re) => json!({
                "$regularExpression": { "pattern": re.pattern, "options": re.options }
            }),
            Bson::Int32(v) => json!(v),
            Bson::Timestamp(ts) => json!({ "$timestamp": { "t": ts.time, "i": ts.increment } }),
            Bson::Int64(v) => json!(v),
        }
    }
}

impl Document {
    /// Converts the document into a relaxed extended JSON object.
    ///
    /// Duplicate keys collapse to the last occurrence.
    pub fn into_relaxed_extjson(self) -> Value {
        let mut map = Map::with_capacity(self.len());
        for (key, value) in self {
            map.insert(key, value.into_relaxed_extjson());
        }
        Value::Object(map)
    }

    pub fn to_relaxed_extjson(&self) -> Value {
        self.clone().into_relaxed_extjson()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_relaxed_extjson())
    }
}

impl fmt::Display for Bson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.clone().into_relaxed_extjson())
    }
}
