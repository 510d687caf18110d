//! Conversion between in-memory [`Datum`]s and stored [`Value`]s.
//!
//! Both directions dispatch on [`classify`], so a value is always read back
//! through the same branch it was written with.

use crate::classify::{Classification, DataType, NativeKind, classify};
use crate::datum::Datum;
use crate::value::{Document, Value, is_reserved};

/// Converts an attribute value for storage. Returns `None` when `datum`
/// does not fit `ty`.
pub fn to_value(ty: &DataType, datum: &Datum) -> Option<Value> {
    match classify(ty) {
        Classification::Native { kind, nullable } => match datum {
            Datum::Null if nullable => Some(Value::Null),
            datum => native_to_value(kind, datum),
        },
        Classification::Complex => complex_to_value(ty, datum),
    }
}

/// Converts a stored value back into an attribute value. Returns `None` when
/// `value` does not fit `ty`.
pub fn from_value(ty: &DataType, value: &Value) -> Option<Datum> {
    match classify(ty) {
        Classification::Native { kind, nullable } => match value {
            Value::Null if nullable => Some(Datum::Null),
            value => native_from_value(kind, value),
        },
        Classification::Complex => complex_from_value(ty, value),
    }
}

fn native_to_value(kind: NativeKind, datum: &Datum) -> Option<Value> {
    Some(match (kind, datum) {
        (NativeKind::Bool, Datum::Bool(v)) => Value::Bool(*v),
        (NativeKind::Char, Datum::Char(v)) => Value::String(v.to_string()),
        (NativeKind::Unicode, Datum::Unicode(v)) => Value::String(v.clone()),
        (NativeKind::ByteString, Datum::Bytes(v)) => Value::Binary(v.clone()),
        (NativeKind::I8, Datum::I8(v)) => Value::Int32(*v as i32),
        (NativeKind::I16, Datum::I16(v)) => Value::Int32(*v as i32),
        (NativeKind::I32, Datum::I32(v)) => Value::Int32(*v),
        (NativeKind::I64, Datum::I64(v)) => Value::Int64(*v),
        (NativeKind::F32, Datum::F32(v)) => Value::Double(*v as f64),
        (NativeKind::F64, Datum::F64(v)) => Value::Double(*v),
        (NativeKind::Date, Datum::Date(v)) => Value::DateTime(*v),
        _ => return None,
    })
}

fn native_from_value(kind: NativeKind, value: &Value) -> Option<Datum> {
    Some(match (kind, value) {
        (NativeKind::Bool, Value::Bool(v)) => Datum::Bool(*v),
        (NativeKind::Char, Value::String(v)) => {
            let mut chars = v.chars();
            let c = chars.next()?;
            if chars.next().is_some() {
                return None;
            }
            Datum::Char(c)
        }
        (NativeKind::Unicode, Value::String(v)) => Datum::Unicode(v.clone()),
        (NativeKind::ByteString, Value::Binary(v)) => Datum::Bytes(v.clone()),
        (NativeKind::I8, v) => Datum::I8(integer(v)?.try_into().ok()?),
        (NativeKind::I16, v) => Datum::I16(integer(v)?.try_into().ok()?),
        (NativeKind::I32, v) => Datum::I32(integer(v)?.try_into().ok()?),
        (NativeKind::I64, v) => Datum::I64(integer(v)?),
        (NativeKind::F32, v) => Datum::F32(float(v)? as f32),
        (NativeKind::F64, v) => Datum::F64(float(v)?),
        (NativeKind::Date, Value::DateTime(v)) => Datum::Date(*v),
        _ => return None,
    })
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Int32(v) => Some(*v as i64),
        Value::Int64(v) => Some(*v),
        _ => None,
    }
}

fn float(value: &Value) -> Option<f64> {
    match value {
        Value::Double(v) => Some(*v),
        Value::Int32(v) => Some(*v as f64),
        Value::Int64(v) => Some(*v as f64),
        _ => None,
    }
}

fn complex_to_value(ty: &DataType, datum: &Datum) -> Option<Value> {
    match (ty, datum) {
        (DataType::Optional(_), Datum::Null) => Some(Value::Null),
        (DataType::Optional(inner), datum) => to_value(inner, datum),
        (DataType::Decimal, Datum::Decimal(v)) => Some(Value::String(v.clone())),
        (DataType::BigInt, Datum::BigInt(v)) => Some(Value::String(v.clone())),
        (DataType::Enum(literals), Datum::Enum(v)) if literals.contains(v) => {
            Some(Value::String(v.clone()))
        }
        (DataType::Record(fields), Datum::Record(values)) => {
            // A `$` field would read back as a value wrapper.
            if fields.keys().any(|k| is_reserved(k))
                || values.keys().any(|k| !fields.contains_key(k))
            {
                return None;
            }
            let mut doc = Document::with_capacity(fields.len());
            for (name, field_ty) in fields {
                if let Some(v) = values.get(name) {
                    doc.insert(name.clone(), to_value(field_ty, v)?);
                }
            }
            Some(Value::Document(doc))
        }
        (DataType::Sequence(inner), Datum::Sequence(items)) => items
            .iter()
            .map(|item| to_value(inner, item))
            .collect::<Option<Vec<_>>>()
            .map(Value::Array),
        _ => None,
    }
}

fn complex_from_value(ty: &DataType, value: &Value) -> Option<Datum> {
    match (ty, value) {
        (DataType::Optional(_), Value::Null) => Some(Datum::Null),
        (DataType::Optional(inner), value) => from_value(inner, value),
        (DataType::Decimal, Value::String(v)) => Some(Datum::Decimal(v.clone())),
        (DataType::BigInt, Value::String(v)) => Some(Datum::BigInt(v.clone())),
        (DataType::Enum(literals), Value::String(v)) if literals.contains(v) => {
            Some(Datum::Enum(v.clone()))
        }
        (DataType::Record(fields), Value::Document(doc)) => {
            let mut record = indexmap::IndexMap::with_capacity(fields.len());
            for (name, field_ty) in fields {
                if let Some(v) = doc.get(name) {
                    record.insert(name.clone(), from_value(field_ty, v)?);
                }
            }
            Some(Datum::Record(record))
        }
        (DataType::Sequence(inner), Value::Array(items)) => items
            .iter()
            .map(|item| from_value(inner, item))
            .collect::<Option<Vec<_>>>()
            .map(Datum::Sequence),
        _ => None,
    }
}
