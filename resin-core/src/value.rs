//! Store-side document values.
//!
//! A [`Document`] is an insertion-ordered map of field names to [`Value`]s.
//! Values serialize through serde so the same documents can be written to
//! any self-describing container format. Types those formats lack natively
//! use single-key wrapper maps:
//!
//! - `{"$oid": "<24 hex>"}` for native identifiers
//! - `{"$date": <epoch millis>}` for instants, or `{"$date": "<RFC 3339>"}`
//!   when the instant has sub-millisecond digits
//! - `{"$binary": "<hex>"}` for byte sequences
//! - `{"$double": "NaN" | "Infinity" | "-Infinity"}` for non-finite doubles,
//!   or `{"$double": "0x<16 hex>"}` for a NaN with other payload or sign bits

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::id::NativeId;

/// Field holding the document's store identifier.
pub const ID_KEY: &str = "_id";
/// Field holding the concrete type name of the encoded object.
pub const TYPE_KEY: &str = "_type";
/// Field holding the address of a referenced document.
pub const PROXY_KEY: &str = "_proxy";
/// Field holding an object's extrinsic identifier.
pub const EXTRINSIC_ID_KEY: &str = "_xid";
/// Field holding the instant the document was last saved.
pub const TIME_STAMP_KEY: &str = "_timeStamp";

const RESERVED_KEYS: [&str; 5] = [ID_KEY, TYPE_KEY, PROXY_KEY, EXTRINSIC_ID_KEY, TIME_STAMP_KEY];

const OID_TAG: &str = "$oid";
const DATE_TAG: &str = "$date";
const BINARY_TAG: &str = "$binary";
const DOUBLE_TAG: &str = "$double";

/// Returns true if `name` cannot be used as an attribute or reference name.
///
/// Besides the reserved document fields this covers every `$`-prefixed
/// name, which would be read back as a value wrapper.
pub fn is_reserved(name: &str) -> bool {
    RESERVED_KEYS.contains(&name) || name.starts_with('$')
}

/// An ordered document.
pub type Document = IndexMap<String, Value>;

/// A value stored in a document field.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    String(String),
    Binary(Vec<u8>),
    DateTime(DateTime<Utc>),
    ObjectId(NativeId),
    Array(Vec<Value>),
    Document(Document),
}

impl Value {
    /// A short name for the value's kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Binary(_) => "binary",
            Value::DateTime(_) => "date",
            Value::ObjectId(_) => "objectId",
            Value::Array(_) => "array",
            Value::Document(_) => "document",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }
}

fn non_finite_name(v: f64) -> String {
    if v.is_nan() {
        if v.to_bits() == f64::NAN.to_bits() {
            "NaN".to_string()
        } else {
            format!("0x{:016x}", v.to_bits())
        }
    } else if v.is_sign_positive() {
        "Infinity".to_string()
    } else {
        "-Infinity".to_string()
    }
}

fn serialize_date<S>(serializer: S, v: &DateTime<Utc>) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if v.timestamp_subsec_nanos() % 1_000_000 == 0 {
        serialize_wrapped(serializer, DATE_TAG, &v.timestamp_millis())
    } else {
        serialize_wrapped(serializer, DATE_TAG, &v.to_rfc3339_opts(SecondsFormat::Nanos, true))
    }
}

fn serialize_wrapped<S, T>(serializer: S, tag: &str, value: &T) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Serialize + ?Sized,
{
    let mut map = serializer.serialize_map(Some(1))?;
    map.serialize_entry(tag, value)?;
    map.end()
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Int32(v) => serializer.serialize_i32(*v),
            Value::Int64(v) => serializer.serialize_i64(*v),
            Value::Double(v) if v.is_finite() => serializer.serialize_f64(*v),
            Value::Double(v) => serialize_wrapped(serializer, DOUBLE_TAG, &non_finite_name(*v)),
            Value::String(v) => serializer.serialize_str(v),
            Value::Binary(v) => serialize_wrapped(serializer, BINARY_TAG, &hex::encode(v)),
            Value::DateTime(v) => serialize_date(serializer, v),
            Value::ObjectId(v) => serialize_wrapped(serializer, OID_TAG, &v.to_string()),
            Value::Array(items) => serializer.collect_seq(items),
            Value::Document(doc) => serializer.collect_map(doc),
        }
    }
}

/// Converts a single-entry `$`-tagged map back into the value it wraps.
fn unwrap_tagged<E: de::Error>(tag: &str, inner: &Value) -> Result<Value, E> {
    match (tag, inner) {
        (OID_TAG, Value::String(s)) => s.parse::<NativeId>().map(Value::ObjectId).map_err(E::custom),
        (DATE_TAG, Value::Int32(ms)) => date_from_millis(*ms as i64),
        (DATE_TAG, Value::Int64(ms)) => date_from_millis(*ms),
        (DATE_TAG, Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|v| Value::DateTime(v.with_timezone(&Utc)))
            .map_err(E::custom),
        (BINARY_TAG, Value::String(s)) => hex::decode(s).map(Value::Binary).map_err(E::custom),
        (DOUBLE_TAG, Value::String(s)) => match s.as_str() {
            "NaN" => Ok(Value::Double(f64::NAN)),
            "Infinity" => Ok(Value::Double(f64::INFINITY)),
            "-Infinity" => Ok(Value::Double(f64::NEG_INFINITY)),
            other => other
                .strip_prefix("0x")
                .and_then(|bits| u64::from_str_radix(bits, 16).ok())
                .map(f64::from_bits)
                .filter(|v| v.is_nan())
                .map(Value::Double)
                .ok_or_else(|| E::custom(format!("invalid $double {other:?}"))),
        },
        (tag, other) => Err(E::custom(format!("invalid {tag} payload: {}", other.kind()))),
    }
}

fn date_from_millis<E: de::Error>(ms: i64) -> Result<Value, E> {
    DateTime::from_timestamp_millis(ms)
        .map(Value::DateTime)
        .ok_or_else(|| E::custom(format!("date out of range: {ms}")))
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a document value")
            }

            fn visit_unit<E>(self) -> Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_none<E>(self) -> Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_some<D>(self, deserializer: D) -> Result<Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                Value::deserialize(deserializer)
            }

            fn visit_bool<E>(self, v: bool) -> Result<Value, E> {
                Ok(Value::Bool(v))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Value, E> {
                Ok(match i32::try_from(v) {
                    Ok(small) => Value::Int32(small),
                    Err(_) => Value::Int64(v),
                })
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
                let v = i64::try_from(v).map_err(|_| E::custom(format!("integer out of range: {v}")))?;
                self.visit_i64(v)
            }

            fn visit_f64<E>(self, v: f64) -> Result<Value, E> {
                Ok(Value::Double(v))
            }

            fn visit_str<E>(self, v: &str) -> Result<Value, E> {
                Ok(Value::String(v.to_string()))
            }

            fn visit_string<E>(self, v: String) -> Result<Value, E> {
                Ok(Value::String(v))
            }

            fn visit_bytes<E>(self, v: &[u8]) -> Result<Value, E> {
                Ok(Value::Binary(v.to_vec()))
            }

            fn visit_byte_buf<E>(self, v: Vec<u8>) -> Result<Value, E> {
                Ok(Value::Binary(v))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }
                Ok(Value::Array(items))
            }

            fn visit_map<A>(self, mut map: A) -> Result<Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut doc = Document::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, Value>()? {
                    doc.insert(key, value);
                }
                if doc.len() == 1 {
                    if let Some((tag, inner)) = doc.first() {
                        if tag.starts_with('$') {
                            return unwrap_tagged(tag, inner);
                        }
                    }
                }
                Ok(Value::Document(doc))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Document(doc)
    }
}
