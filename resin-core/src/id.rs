use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::value::Value;

/// A 12-byte identifier generated by the document store.
///
/// Layout: 4-byte big-endian creation time in seconds, 5 bytes of
/// per-process randomness, 3-byte counter. Rendered as 24 lowercase hex
/// characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeId([u8; 12]);

/// Error returned when a string is not a native identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a native identifier: {0:?}")]
pub struct ParseIdError(String);

impl NativeId {
    /// Generates a fresh identifier, unique within this process.
    pub fn generate() -> Self {
        static PROCESS: OnceLock<[u8; 5]> = OnceLock::new();
        static COUNTER: OnceLock<AtomicU32> = OnceLock::new();

        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        let process = PROCESS.get_or_init(|| rand::random());
        let count = COUNTER
            .get_or_init(|| AtomicU32::new(rand::random()))
            .fetch_add(1, Ordering::Relaxed);

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(process);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);
        NativeId(bytes)
    }

    /// Creates an identifier from raw bytes.
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        NativeId(bytes)
    }

    /// Returns the identifier as a byte slice.
    pub fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }

    /// Seconds since the Unix epoch at which this identifier was generated.
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }
}

impl FromStr for NativeId {
    type Err = ParseIdError;

    /// Accepts exactly 24 lowercase hex characters, so that `to_string`
    /// reproduces the input byte for byte.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let canonical = s.len() == 24
            && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !canonical {
            return Err(ParseIdError(s.to_string()));
        }
        let mut bytes = [0u8; 12];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| ParseIdError(s.to_string()))?;
        Ok(NativeId(bytes))
    }
}

impl fmt::Debug for NativeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeId({})", self)
    }
}

impl fmt::Display for NativeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// The identity of a stored document.
///
/// Address segments that parse as a [`NativeId`] are native; every other
/// non-empty segment is kept verbatim as an external identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ObjectId {
    /// Store-generated identifier.
    Native(NativeId),
    /// Caller-supplied identifier.
    External(String),
}

impl ObjectId {
    /// Decodes the identifier segment of an address.
    ///
    /// Returns `None` for the empty segment, which means the store assigns
    /// the identifier on insert.
    pub fn from_segment(segment: &str) -> Option<Self> {
        if segment.is_empty() {
            return None;
        }
        Some(match segment.parse::<NativeId>() {
            Ok(id) => ObjectId::Native(id),
            Err(_) => ObjectId::External(segment.to_string()),
        })
    }

    /// Encodes the identifier as an address segment.
    pub fn to_segment(&self) -> String {
        self.to_string()
    }

    /// Returns true for store-generated identifiers.
    pub fn is_native(&self) -> bool {
        matches!(self, ObjectId::Native(_))
    }

    /// The value stored in a document's `_id` field.
    pub fn to_value(&self) -> Value {
        match self {
            ObjectId::Native(id) => Value::ObjectId(*id),
            ObjectId::External(id) => Value::String(id.clone()),
        }
    }

    /// Reads a document's `_id` field.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::ObjectId(id) => Some(ObjectId::Native(*id)),
            Value::String(id) if !id.is_empty() => Some(ObjectId::External(id.clone())),
            _ => None,
        }
    }
}

impl From<NativeId> for ObjectId {
    fn from(id: NativeId) -> Self {
        ObjectId::Native(id)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectId::Native(id) => fmt::Display::fmt(id, f),
            ObjectId::External(id) => f.write_str(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_id_roundtrip() {
        let id = NativeId::generate();
        let text = id.to_string();
        assert_eq!(text.len(), 24);
        assert_eq!(text.parse::<NativeId>().unwrap(), id);
    }

    #[test]
    fn native_ids_are_distinct() {
        let a = NativeId::generate();
        let b = NativeId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_bytes()[4..9], b.as_bytes()[4..9]);
    }

    #[test]
    fn native_id_timestamp() {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as u32;
        let id = NativeId::generate();
        assert!(id.timestamp() >= now - 1 && id.timestamp() <= now + 1);
    }

    #[test]
    fn segment_parses_native() {
        let id = ObjectId::from_segment("4d0a3e259095b5b334a59df0").unwrap();
        assert!(id.is_native());
        assert_eq!(id.to_segment(), "4d0a3e259095b5b334a59df0");
    }

    #[test]
    fn segment_falls_back_to_external() {
        assert_eq!(
            ObjectId::from_segment("ID"),
            Some(ObjectId::External("ID".to_string()))
        );
        // Uppercase hex would not print back identically.
        let upper = ObjectId::from_segment("4D0A3E259095B5B334A59DF0").unwrap();
        assert!(!upper.is_native());
        assert_eq!(upper.to_segment(), "4D0A3E259095B5B334A59DF0");
        // Too short.
        assert!(!ObjectId::from_segment("4d0a3e").unwrap().is_native());
    }

    #[test]
    fn empty_segment_is_unassigned() {
        assert_eq!(ObjectId::from_segment(""), None);
    }

    #[test]
    fn value_roundtrip() {
        let native = ObjectId::Native(NativeId::generate());
        assert_eq!(ObjectId::from_value(&native.to_value()), Some(native));

        let external = ObjectId::External("person-7".to_string());
        assert_eq!(ObjectId::from_value(&external.to_value()), Some(external));

        assert_eq!(ObjectId::from_value(&Value::Int32(3)), None);
    }
}
