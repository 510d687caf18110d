//! Whole-resource serialization to JSON text or CBOR.
//!
//! A container holds the resource address and one encoded document per
//! root object. Contained objects are always embedded; references that
//! point into a store keep their store addresses, so a graph read back from
//! a container can still be resolved through a [`Handler`](crate::Handler).

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::decode::Decoder;
use crate::encode::Encoder;
use crate::error::Result;
use crate::model::Registry;
use crate::options::Options;
use crate::resource::{ObjectPath, Resource};
use crate::value::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// JSON text (serde_json).
    Json,
    /// CBOR binary (ciborium).
    Cbor,
}

#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CBOR error: {0}")]
    Cbor(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct Container {
    address: Address,
    contents: Vec<Document>,
}

/// Serializes `resource` into `writer`.
pub fn write<W: Write>(resource: &Resource, format: Format, writer: W, options: &Options) -> Result<()> {
    let options = options.clone().sibling_threshold(None);
    let address = resource.address();
    let id = match resource.len() {
        1 => address.object_id().ok().flatten(),
        _ => None,
    };
    let encoder = Encoder::new(&options, resource.extrinsic_ids());

    let contents = resource
        .contents()
        .iter()
        .enumerate()
        .map(|(index, object)| {
            encoder
                .encode(object.as_ref(), &ObjectPath::root(index), id.as_ref())
                .map(|encoded| encoded.document)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let container = Container {
        address: address.clone(),
        contents,
    };
    match format {
        Format::Json => serde_json::to_writer(writer, &container).map_err(ContainerError::from)?,
        Format::Cbor => ciborium::into_writer(&container, writer)
            .map_err(|e| ContainerError::Cbor(format!("write error: {}", e)))?,
    }
    log::debug!("wrote {} objects of {address} as {format:?}", resource.len());
    Ok(())
}

/// Reads a resource previously written with [`write`].
pub fn read<R: Read>(reader: R, format: Format, registry: &Registry) -> Result<Resource> {
    let container: Container = match format {
        Format::Json => serde_json::from_reader(reader).map_err(ContainerError::from)?,
        Format::Cbor => ciborium::from_reader(reader)
            .map_err(|e| ContainerError::Cbor(format!("read error: {}", e)))?,
    };

    let decoder = Decoder::new(registry);
    let mut resource = Resource::new(container.address);
    for (index, document) in container.contents.iter().enumerate() {
        let decoded = decoder.decode(document, &ObjectPath::root(index))?;
        resource.absorb(decoded.object, decoded.extrinsic_ids, decoded.time_stamp);
    }
    Ok(resource)
}

/// Serializes `resource` into a byte vector.
pub fn to_vec(resource: &Resource, format: Format, options: &Options) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    write(resource, format, &mut bytes, options)?;
    Ok(bytes)
}

/// Reads a resource from a byte slice.
pub fn from_slice(bytes: &[u8], format: Format, registry: &Registry) -> Result<Resource> {
    read(bytes, format, registry)
}
