use crate::address::{Address, AddressError};
use crate::batch::BatchResult;
use crate::container::ContainerError;
use crate::decode::DecodeError;
use crate::encode::EncodeError;

/// Error type for handler operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed address: {0}")]
    MalformedAddress(#[from] AddressError),
    #[error("unsupported scheme {0:?}")]
    UnsupportedScheme(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("encode failed: {0}")]
    Encode(#[from] EncodeError),
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("no object at {0}")]
    NotFound(Address),
    #[error("batch aborted at object {index} after {} saved: {source}", .completed.len())]
    Batch {
        completed: BatchResult,
        index: usize,
        source: Box<Error>,
    },
    #[error("container format error: {0}")]
    Container(#[from] ContainerError),
}

impl Error {
    /// Wraps a store driver error.
    pub fn store<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::StoreUnavailable(Box::new(err))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
