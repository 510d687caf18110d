use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::id::ObjectId;
use crate::store::Namespace;

/// Scheme handled by default.
pub const DEFAULT_SCHEME: &str = "resin";

/// Number of path segments in an object or collection address.
const OBJECT_PATH_SEGMENTS: usize = 3;

/// Error returned for addresses that cannot be parsed or do not name a
/// store target.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address has no scheme: {0:?}")]
    MissingScheme(String),
    #[error("invalid port {port:?} in address {address:?}")]
    InvalidPort { address: String, port: String },
    #[error("invalid percent-encoding in address {0:?}")]
    InvalidEncoding(String),
    #[error("address {address} is not of the form scheme://host/store/collection/{{id}}: {reason}")]
    Malformed { address: String, reason: String },
}

/// A persistence address: `scheme://host[:port]/store/collection/[id]`.
///
/// Path segments are kept percent-decoded. An address with an empty last
/// segment names a collection; objects saved there receive a
/// store-assigned identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    scheme: String,
    host: String,
    port: Option<u16>,
    segments: Vec<String>,
    query: Option<String>,
}

impl Address {
    /// Parses an address string.
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let (scheme, rest) = input
            .split_once(':')
            .filter(|(scheme, _)| is_scheme(scheme))
            .ok_or_else(|| AddressError::MissingScheme(input.to_string()))?;

        let (rest, query) = match rest.split_once('?') {
            Some((rest, query)) => (rest, Some(query.to_string())),
            None => (rest, None),
        };

        let (authority, path) = match rest.strip_prefix("//") {
            Some(after) => match after.find('/') {
                Some(i) => after.split_at(i),
                None => (after, ""),
            },
            None => ("", rest),
        };

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| AddressError::InvalidPort {
                    address: input.to_string(),
                    port: port.to_string(),
                })?;
                (host, Some(port))
            }
            None => (authority, None),
        };

        let path = path.strip_prefix('/').unwrap_or(path);
        let segments = if path.is_empty() {
            Vec::new()
        } else {
            path.split('/')
                .map(|segment| {
                    percent_decode(segment)
                        .ok_or_else(|| AddressError::InvalidEncoding(input.to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(Address {
            scheme: scheme.to_string(),
            host: host.to_string(),
            port,
            segments,
            query,
        })
    }

    /// Builds a collection address (`.../store/collection/`).
    pub fn for_collection(
        scheme: &str,
        host: &str,
        port: Option<u16>,
        store: &str,
        collection: &str,
    ) -> Self {
        Address {
            scheme: scheme.to_string(),
            host: host.to_string(),
            port,
            segments: vec![store.to_string(), collection.to_string(), String::new()],
            query: None,
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// First path segment, naming the database.
    pub fn store(&self) -> Option<&str> {
        self.segments.first().map(String::as_str)
    }

    /// Second path segment, naming the collection.
    pub fn collection(&self) -> Option<&str> {
        self.segments.get(1).map(String::as_str)
    }

    /// Third path segment, still undecoded into an [`ObjectId`].
    pub fn id_segment(&self) -> Option<&str> {
        self.segments.get(2).map(String::as_str)
    }

    /// `host[:port]`, the part of the address that selects a store server.
    pub fn store_url(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        }
    }

    /// Checks that the path is `/store/collection/{id}` with non-empty store
    /// and collection segments. No part of the namespace or id may hold NUL.
    pub fn require_object_path(&self) -> Result<(), AddressError> {
        if self.segments.len() != OBJECT_PATH_SEGMENTS {
            return Err(self.malformed(format!(
                "expected {} path segments, found {}",
                OBJECT_PATH_SEGMENTS,
                self.segments.len()
            )));
        }
        if self.segments[0].is_empty() || self.segments[1].is_empty() {
            return Err(self.malformed("store and collection segments must not be empty".into()));
        }
        if self.host.contains('\0') || self.segments.iter().any(|s| s.contains('\0')) {
            return Err(self.malformed("NUL characters are not allowed".into()));
        }
        Ok(())
    }

    /// The store and collection this address targets.
    pub fn namespace(&self) -> Result<Namespace, AddressError> {
        self.require_object_path()?;
        Ok(Namespace::new(
            self.store_url(),
            &self.segments[0],
            &self.segments[1],
        ))
    }

    /// The identifier segment, decoded. `None` means store-assigned.
    pub fn object_id(&self) -> Result<Option<ObjectId>, AddressError> {
        self.require_object_path()?;
        Ok(ObjectId::from_segment(&self.segments[2]))
    }

    /// Returns true if this is a 3-segment address with an empty identifier.
    pub fn is_collection(&self) -> bool {
        self.require_object_path().is_ok() && self.segments[2].is_empty()
    }

    /// The same address with the identifier segment replaced.
    pub fn with_id(&self, id: &ObjectId) -> Result<Address, AddressError> {
        self.require_object_path()?;
        let mut address = self.clone();
        address.segments[2] = id.to_segment();
        address.query = None;
        Ok(address)
    }

    /// The collection this address belongs to.
    pub fn collection_address(&self) -> Result<Address, AddressError> {
        self.require_object_path()?;
        let mut address = self.clone();
        address.segments[2].clear();
        address.query = None;
        Ok(address)
    }

    fn malformed(&self, reason: String) -> AddressError {
        AddressError::Malformed {
            address: self.to_string(),
            reason,
        }
    }
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn percent_encode(segment: &str, out: &mut fmt::Formatter<'_>) -> fmt::Result {
    for byte in segment.bytes() {
        match byte {
            b'%' | b'/' | b'?' | b'#' => write!(out, "%{:02X}", byte)?,
            b if b.is_ascii_graphic() => write!(out, "{}", b as char)?,
            b => write!(out, "%{:02X}", b)?,
        }
    }
    Ok(())
}

fn percent_decode(segment: &str) -> Option<String> {
    if !segment.contains('%') {
        return Some(segment.to_string());
    }
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = segment.get(i + 1..i + 3)?;
            if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.scheme)?;
        if !self.host.is_empty() || self.port.is_some() {
            write!(f, "//{}", self.host)?;
            if let Some(port) = self.port {
                write!(f, ":{}", port)?;
            }
        }
        for segment in &self.segments {
            f.write_str("/")?;
            percent_encode(segment, f)?;
        }
        if let Some(query) = &self.query {
            write!(f, "?{}", query)?;
        }
        Ok(())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        Address::parse(&text).map_err(serde::de::Error::custom)
    }
}
