//! Resin persists typed object graphs in a document store.
//!
//! Core concepts:
//! - **Address**: `scheme://host[:port]/store/collection/[id]`, naming one document or a collection
//! - **Model**: An object that describes its attributes and references through a [`Class`]
//! - **Document**: The ordered field map an object graph is encoded into
//! - **Proxy**: A reference to a stored object (resolved or unresolved)
//! - **Handler**: Saves, loads, checks and deletes resources through a [`DocumentStore`]
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use resin_core::{
//!     Address, AttributeDef, Class, DataType, Datum, Handler, MemoryStore, Model, ModelError,
//!     Options, Registry, Resource,
//! };
//!
//! #[derive(Debug, Default)]
//! struct Person {
//!     name: String,
//! }
//!
//! impl Model for Person {
//!     fn class(&self) -> Class {
//!         Class::new("Person").attribute(AttributeDef::new("name", DataType::Unicode))
//!     }
//!
//!     fn attribute(&self, name: &str) -> Option<Datum> {
//!         (name == "name").then(|| Datum::from(self.name.as_str()))
//!     }
//!
//!     fn set_attribute(&mut self, name: &str, value: Datum) -> Result<(), ModelError> {
//!         match (name, value) {
//!             ("name", Datum::Unicode(v)) => self.name = v,
//!             (name, value) => return Err(ModelError::mismatch("Person", name, value)),
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let registry = Arc::new(Registry::builder().register_default::<Person>().build());
//! let store = MemoryStore::new();
//! let handler = Handler::new(&store, registry);
//! let options = Options::default();
//!
//! let mut resource = Resource::new(Address::parse("resin://localhost/data/people/")?);
//! resource.push(Person { name: "Ada".into() });
//!
//! // The store assigns the identifier; bind moves the resource to it.
//! let outcome = handler.save(&resource, &options)?;
//! resource.bind(outcome);
//! assert!(handler.exists(resource.address(), &options));
//!
//! let loaded = handler.load(resource.address(), &options)?;
//! assert_eq!(loaded.root::<Person>().unwrap().name, "Ada");
//! # Ok::<(), resin_core::Error>(())
//! ```
//!
//! # Stored form
//!
//! Each root object becomes one document: `_id` first, then `_type`, the
//! optional `_xid` extrinsic id, the attribute and reference fields, and the
//! `_timeStamp` of the save. Scalars are mapped by [`classify`]; contained
//! objects are nested documents; other references are `{_proxy, _type}`
//! fields holding the target's address.

mod address;
mod batch;
mod classify;
pub mod coerce;
pub mod container;
mod datum;
mod decode;
mod encode;
mod error;
mod handler;
mod id;
mod model;
mod options;
mod proxy;
mod resource;
mod store;
mod value;

#[cfg(test)]
mod fixtures;

pub use address::{Address, AddressError, DEFAULT_SCHEME};
pub use batch::BatchResult;
pub use classify::{Classification, DataType, FloatType, IntType, NativeKind, classify};
pub use container::{ContainerError, Format};
pub use datum::Datum;
pub use decode::{DecodeError, Decoded, Decoder};
pub use encode::{EncodeError, Encoded, Encoder, Sibling, proxy_field};
pub use error::{Error, Result};
pub use handler::{Handler, InputStream, Loaded, OutputStream};
pub use id::{NativeId, ObjectId, ParseIdError};
pub use model::{
    AttributeDef, Class, Constructor, Link, LinkRef, Model, ModelError, ReferenceDef, Registry,
    RegistryBuilder,
};
pub use options::Options;
pub use proxy::{Proxy, Resolve};
pub use resource::{ExtrinsicIds, ObjectPath, Resource, SaveOutcome};
pub use store::{Cursor, DocumentStore, MemoryStore, MemoryStoreError, Namespace, document_id, with_document_id};
pub use value::{
    Document, EXTRINSIC_ID_KEY, ID_KEY, PROXY_KEY, TIME_STAMP_KEY, TYPE_KEY, Value, is_reserved,
};
