use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Integer widths available to attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntType {
    I8,
    I16,
    I32,
    I64,
}

/// Floating-point widths available to attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FloatType {
    F32,
    F64,
}

/// Schema-level type of an attribute value.
///
/// The first group are scalar kinds a document can hold directly; the rest
/// need structural encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    // Scalars
    /// Boolean value.
    Bool,
    /// Single Unicode scalar value.
    Char,
    /// UTF-8 text.
    Unicode,
    /// Byte sequence.
    ByteString,
    /// Signed integer of the given width.
    Int(IntType),
    /// IEEE 754 float of the given width.
    Float(FloatType),
    /// Calendar instant (UTC, millisecond precision).
    Date,
    /// Nullable wrapper around another type.
    Optional(Box<DataType>),

    // Structural
    /// Arbitrary-precision decimal, carried as its literal text.
    Decimal,
    /// Arbitrary-precision integer, carried as its literal text.
    BigInt,
    /// Closed set of named literals.
    Enum(Vec<String>),
    /// Named fields, encoded as a nested document.
    Record(IndexMap<String, DataType>),
    /// Homogeneous list, encoded as an array.
    Sequence(Box<DataType>),
}

impl DataType {
    /// Creates a nullable type.
    pub fn optional(inner: DataType) -> Self {
        DataType::Optional(Box::new(inner))
    }

    /// Creates a sequence type.
    pub fn sequence(inner: DataType) -> Self {
        DataType::Sequence(Box::new(inner))
    }

    /// Creates a record type from field definitions.
    pub fn record(fields: impl IntoIterator<Item = (&'static str, DataType)>) -> Self {
        DataType::Record(fields.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    /// Creates an enum type from its literals.
    pub fn enumeration(literals: impl IntoIterator<Item = &'static str>) -> Self {
        DataType::Enum(literals.into_iter().map(str::to_string).collect())
    }
}

/// A scalar kind a document stores without structural decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeKind {
    Bool,
    Char,
    Unicode,
    ByteString,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Date,
}

/// Result of [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Stored as a single document scalar. `nullable` is set for the boxed
    /// form, which also admits null.
    Native { kind: NativeKind, nullable: bool },
    /// Stored as a nested document, an array or a literal string.
    Complex,
}

/// Decides how a value of type `ty` is stored.
///
/// Encoding and decoding both go through this function, so a type is
/// always read back the way it was written.
pub fn classify(ty: &DataType) -> Classification {
    let kind = match ty {
        DataType::Bool => NativeKind::Bool,
        DataType::Char => NativeKind::Char,
        DataType::Unicode => NativeKind::Unicode,
        DataType::ByteString => NativeKind::ByteString,
        DataType::Int(IntType::I8) => NativeKind::I8,
        DataType::Int(IntType::I16) => NativeKind::I16,
        DataType::Int(IntType::I32) => NativeKind::I32,
        DataType::Int(IntType::I64) => NativeKind::I64,
        DataType::Float(FloatType::F32) => NativeKind::F32,
        DataType::Float(FloatType::F64) => NativeKind::F64,
        DataType::Date => NativeKind::Date,
        DataType::Optional(inner) => {
            return match classify(inner) {
                Classification::Native { kind, .. } => Classification::Native {
                    kind,
                    nullable: true,
                },
                Classification::Complex => Classification::Complex,
            };
        }
        DataType::Decimal
        | DataType::BigInt
        | DataType::Enum(_)
        | DataType::Record(_)
        | DataType::Sequence(_) => return Classification::Complex,
    };
    Classification::Native {
        kind,
        nullable: false,
    }
}
