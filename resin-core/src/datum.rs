use chrono::{DateTime, Utc};
use indexmap::IndexMap;

/// An in-memory attribute value, as exchanged with [`Model`](crate::Model)
/// implementations.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Null,
    Bool(bool),
    Char(char),
    Unicode(String),
    Bytes(Vec<u8>),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Date(DateTime<Utc>),
    Decimal(String),
    BigInt(String),
    Enum(String),
    Record(IndexMap<String, Datum>),
    Sequence(Vec<Datum>),
}

impl Datum {
    /// Compares two values, treating floats as equal only when their bit
    /// patterns match (so `-0.0` differs from `0.0`).
    pub fn same_as(&self, other: &Datum) -> bool {
        match (self, other) {
            (Datum::F32(a), Datum::F32(b)) => a.to_bits() == b.to_bits(),
            (Datum::F64(a), Datum::F64(b)) => a.to_bits() == b.to_bits(),
            (Datum::Sequence(a), Datum::Sequence(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_as(y))
            }
            (Datum::Record(a), Datum::Record(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(k, v)| b.get(k).is_some_and(|w| v.same_as(w)))
            }
            _ => self == other,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    /// Converts a nullable value, mapping `Null` to `None`.
    ///
    /// On mismatch the original datum is handed back.
    pub fn into_option<T>(self) -> Result<Option<T>, Datum>
    where
        T: TryFrom<Datum, Error = Datum>,
    {
        match self {
            Datum::Null => Ok(None),
            other => T::try_from(other).map(Some),
        }
    }

    /// Converts a sequence value element by element.
    pub fn into_vec<T>(self) -> Result<Vec<T>, Datum>
    where
        T: TryFrom<Datum, Error = Datum>,
    {
        match self {
            Datum::Null => Ok(Vec::new()),
            Datum::Sequence(items) => items.into_iter().map(T::try_from).collect(),
            other => Err(other),
        }
    }
}

macro_rules! impl_datum_conversions {
    ($t:ty, $variant:ident) => {
        impl From<$t> for Datum {
            fn from(v: $t) -> Self {
                Datum::$variant(v)
            }
        }

        impl TryFrom<Datum> for $t {
            type Error = Datum;

            fn try_from(d: Datum) -> Result<Self, Datum> {
                match d {
                    Datum::$variant(v) => Ok(v),
                    other => Err(other),
                }
            }
        }
    };
}

impl_datum_conversions!(bool, Bool);
impl_datum_conversions!(char, Char);
impl_datum_conversions!(String, Unicode);
impl_datum_conversions!(Vec<u8>, Bytes);
impl_datum_conversions!(i8, I8);
impl_datum_conversions!(i16, I16);
impl_datum_conversions!(i32, I32);
impl_datum_conversions!(i64, I64);
impl_datum_conversions!(f32, F32);
impl_datum_conversions!(f64, F64);
impl_datum_conversions!(DateTime<Utc>, Date);
impl_datum_conversions!(IndexMap<String, Datum>, Record);

impl From<&str> for Datum {
    fn from(v: &str) -> Self {
        Datum::Unicode(v.to_string())
    }
}

impl<T: Into<Datum>> From<Option<T>> for Datum {
    fn from(v: Option<T>) -> Self {
        v.map_or(Datum::Null, Into::into)
    }
}
