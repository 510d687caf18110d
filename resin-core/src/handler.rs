use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};

use crate::address::{Address, AddressError, DEFAULT_SCHEME};
use crate::batch::BatchResult;
use crate::decode::Decoder;
use crate::encode::Encoder;
use crate::error::{Error, Result};
use crate::id::ObjectId;
use crate::model::{Model, Registry};
use crate::options::Options;
use crate::proxy::{Proxy, Resolve};
use crate::resource::{ExtrinsicIds, ObjectPath, Resource, SaveOutcome};
use crate::store::{DocumentStore, Namespace};
use crate::value::{Document, PROXY_KEY, TIME_STAMP_KEY, TYPE_KEY, Value};

/// Saves and loads resources addressed by `scheme://host/store/collection/id`.
///
/// The handler borrows nothing beyond its store and registry: every call
/// parses its address, talks to the store and returns.
pub struct Handler<S> {
    store: S,
    registry: Arc<Registry>,
    scheme: String,
}

impl<S: DocumentStore> Handler<S> {
    pub fn new(store: S, registry: Arc<Registry>) -> Self {
        Handler {
            store,
            registry,
            scheme: DEFAULT_SCHEME.to_string(),
        }
    }

    /// Handles `scheme` instead of the default one.
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns true if `address` uses this handler's scheme (ignoring case).
    pub fn can_handle(&self, address: &Address) -> bool {
        address.scheme().eq_ignore_ascii_case(&self.scheme)
    }

    fn target(&self, address: &Address) -> Result<(Namespace, Option<ObjectId>)> {
        if !self.can_handle(address) {
            return Err(Error::UnsupportedScheme(address.scheme().to_string()));
        }
        Ok((address.namespace()?, address.object_id()?))
    }

    /// Opens a stream that writes root objects to `address`.
    pub fn create_output_stream(&self, address: &Address, options: &Options) -> Result<OutputStream<'_, S>> {
        let (namespace, id) = self.target(address)?;
        Ok(OutputStream {
            handler: self,
            collection: address.collection_address()?,
            address: address.clone(),
            namespace,
            id,
            options: options.clone(),
            result: BatchResult::new(),
            generated_ids: ExtrinsicIds::new(),
            time_stamp: None,
        })
    }

    /// Opens a stream over the documents at `address`.
    ///
    /// An object address yields at most one item; a collection address
    /// yields every document of the collection. Each item is decoded on its
    /// own, so a corrupt document does not end the stream.
    pub fn create_input_stream(&self, address: &Address, _options: &Options) -> Result<InputStream<'_>> {
        let (namespace, id) = self.target(address)?;
        let documents: DocumentIter<'_> = match id {
            Some(id) => {
                let found = self.store.find_one(&namespace, &id).map_err(Error::store)?;
                Box::new(found.into_iter().map(Ok))
            }
            None => {
                let cursor = self.store.scan(&namespace).map_err(Error::store)?;
                Box::new(cursor.map(|document| document.map_err(Error::store)))
            }
        };
        Ok(InputStream {
            documents,
            decoder: Decoder::new(&self.registry),
            address: address.clone(),
            collection: address.collection_address()?,
            index: 0,
        })
    }

    /// Writes the contents of `resource`.
    ///
    /// The resource is left untouched; apply the outcome with
    /// [`Resource::bind`]. Several objects can only be saved into a
    /// collection address. If one of them fails, the objects saved before it
    /// are reported in [`Error::Batch`] and stay in the store.
    pub fn save(&self, resource: &Resource, options: &Options) -> Result<SaveOutcome> {
        let address = resource.address();
        if resource.len() > 1 && !address.is_collection() {
            return Err(Error::MalformedAddress(AddressError::Malformed {
                address: address.to_string(),
                reason: format!("{} objects cannot share one object address", resource.len()),
            }));
        }

        let mut stream = self.create_output_stream(address, options)?;
        for (index, object) in resource.contents().iter().enumerate() {
            let written = stream.write(object.as_ref(), resource.extrinsic_ids()).map(|_| ());
            if let Err(source) = written {
                if resource.len() == 1 {
                    return Err(source);
                }
                log::warn!("batch save to {address} aborted at object {index}: {source}");
                return Err(Error::Batch {
                    completed: stream.result,
                    index,
                    source: Box::new(source),
                });
            }
        }
        Ok(stream.finish())
    }

    /// Reads the resource at `address`.
    ///
    /// A missing object yields an empty resource. A collection address
    /// loads every document; the batch result then lists their addresses.
    /// Documents of a collection that fail to decode are skipped with a
    /// warning.
    pub fn load(&self, address: &Address, options: &Options) -> Result<Resource> {
        let mut resource = Resource::new(address.clone());
        let mut listed = BatchResult::new();
        for (index, loaded) in self.create_input_stream(address, options)?.enumerate() {
            let loaded = match loaded {
                Ok(loaded) => loaded,
                Err(Error::Decode(err)) if address.is_collection() => {
                    log::warn!("skipping document {index} of {address}: {err}");
                    continue;
                }
                Err(err) => return Err(err),
            };
            listed.push(Proxy::new(loaded.address));
            resource.absorb(loaded.object, loaded.extrinsic_ids, loaded.time_stamp);
        }
        if address.is_collection() {
            resource.set_batch(listed);
        }
        log::debug!("loaded {} objects from {address}", resource.len());
        Ok(resource)
    }

    /// Returns true if a document is stored at `address`.
    ///
    /// Addresses with a query, without an id, or that this handler cannot
    /// parse or reach all report `false`.
    pub fn exists(&self, address: &Address, _options: &Options) -> bool {
        if address.query().is_some() {
            return false;
        }
        let Ok((namespace, Some(id))) = self.target(address) else {
            return false;
        };
        match self.store.find_one(&namespace, &id) {
            Ok(found) => found.is_some(),
            Err(err) => {
                log::warn!("exists check for {address} failed: {err}");
                false
            }
        }
    }

    /// Like [`Handler::exists`], for an unparsed address.
    pub fn exists_uri(&self, address: &str, options: &Options) -> bool {
        Address::parse(address).is_ok_and(|address| self.exists(&address, options))
    }

    /// Removes the document at `address` together with the sibling
    /// documents its containments were split into. Removing a missing
    /// document succeeds.
    pub fn delete(&self, address: &Address, _options: &Options) -> Result<()> {
        let (namespace, id) = self.target(address)?;
        let id = id.ok_or_else(|| AddressError::Malformed {
            address: address.to_string(),
            reason: "no object identifier".to_string(),
        })?;
        let removed = self
            .store
            .find_and_remove(&namespace, &id)
            .map_err(Error::store)?;
        log::debug!("delete {address}: {}", if removed.is_some() { "removed" } else { "absent" });
        if let Some(document) = removed {
            let mut siblings = Vec::new();
            self.owned_siblings(&document, &namespace, &mut siblings);
            self.remove_siblings(&namespace, siblings)?;
        }
        Ok(())
    }

    /// Collects the ids of the sibling documents `document` owns: proxy
    /// fields of containment references that point into `namespace`.
    /// Embedded children are searched too.
    fn owned_siblings(
        &self,
        document: &Document,
        namespace: &Namespace,
        out: &mut Vec<ObjectId>,
    ) {
        let Some(type_name) = document.get(TYPE_KEY).and_then(Value::as_str) else {
            return;
        };
        let Some(class) = self.registry.create(type_name).map(|object| object.class()) else {
            log::warn!("cannot find siblings of unknown type {type_name}");
            return;
        };
        for reference in class.references.iter().filter(|r| r.containment) {
            let fields = match document.get(reference.name) {
                Some(Value::Array(items)) => items.as_slice(),
                Some(field) => std::slice::from_ref(field),
                None => continue,
            };
            for field in fields.iter().filter_map(Value::as_document) {
                match field.get(PROXY_KEY).and_then(Value::as_str) {
                    Some(target) => {
                        let Ok(target) = Address::parse(target) else {
                            continue;
                        };
                        if target.namespace().is_ok_and(|ns| &ns == namespace) {
                            if let Ok(Some(id)) = target.object_id() {
                                out.push(id);
                            }
                        }
                    }
                    None => self.owned_siblings(field, namespace, out),
                }
            }
        }
    }

    /// Removes sibling documents and, in turn, the siblings they own.
    fn remove_siblings(&self, namespace: &Namespace, mut pending: Vec<ObjectId>) -> Result<()> {
        while let Some(id) = pending.pop() {
            let removed = self
                .store
                .find_and_remove(namespace, &id)
                .map_err(Error::store)?;
            if let Some(document) = removed {
                log::debug!("removed sibling {id} from {namespace}");
                self.owned_siblings(&document, namespace, &mut pending);
            }
        }
        Ok(())
    }

    /// Loads the target of `proxy`.
    pub fn resolve(&self, proxy: Proxy) -> Result<Proxy> {
        proxy.resolve(self)
    }
}

impl<S: DocumentStore> Resolve for Handler<S> {
    type Error = Error;

    fn resolve_address(&self, address: &Address) -> Result<Arc<dyn Model>> {
        let (namespace, id) = self.target(address)?;
        let id = id.ok_or_else(|| Error::NotFound(address.clone()))?;
        let document = self
            .store
            .find_one(&namespace, &id)
            .map_err(Error::store)?
            .ok_or_else(|| Error::NotFound(address.clone()))?;
        let decoded = Decoder::new(&self.registry).decode(&document, &ObjectPath::root(0))?;
        log::debug!("resolved {address}");
        Ok(Arc::from(decoded.object))
    }
}

/// Writes root objects to one address. Created by
/// [`Handler::create_output_stream`].
pub struct OutputStream<'a, S> {
    handler: &'a Handler<S>,
    address: Address,
    collection: Address,
    namespace: Namespace,
    id: Option<ObjectId>,
    options: Options,
    result: BatchResult,
    generated_ids: ExtrinsicIds,
    time_stamp: Option<DateTime<Utc>>,
}

impl<S: DocumentStore> OutputStream<'_, S> {
    /// Encodes and stores one root object.
    ///
    /// `ids` holds the extrinsic ids of the resource the object belongs to.
    /// Returns a proxy addressing the stored document.
    pub fn write(&mut self, object: &dyn Model, ids: &ExtrinsicIds) -> Result<&Proxy> {
        let index = self.result.len();
        if self.id.is_some() && index > 0 {
            return Err(Error::MalformedAddress(AddressError::Malformed {
                address: self.address.to_string(),
                reason: "an object address holds a single object".to_string(),
            }));
        }

        let path = ObjectPath::root(index);
        let encoded = Encoder::new(&self.options, ids)
            .with_collection(&self.collection)
            .encode(object, &path, self.id.as_ref())?;

        let store = &self.handler.store;
        for sibling in encoded.siblings {
            store
                .insert(&self.namespace, sibling.document)
                .map_err(Error::store)?;
        }

        let time_stamp = Utc::now().trunc_subsecs(3);
        let document = stamped(encoded.document, time_stamp);
        let id = match encoded.id {
            Some(id) => {
                // Siblings of the replaced document that the new one no
                // longer points at.
                let mut stale = Vec::new();
                if let Some(previous) = store.find_one(&self.namespace, &id).map_err(Error::store)? {
                    self.handler.owned_siblings(&previous, &self.namespace, &mut stale);
                    let mut kept = Vec::new();
                    self.handler.owned_siblings(&document, &self.namespace, &mut kept);
                    stale.retain(|old| !kept.contains(old));
                }
                store.upsert(&self.namespace, &id, document).map_err(Error::store)?;
                self.handler.remove_siblings(&self.namespace, stale)?;
                id
            }
            None => store.insert(&self.namespace, document).map_err(Error::store)?,
        };

        let address = self.collection.with_id(&id)?;
        log::debug!("saved {} to {address}", object.class().name);
        self.generated_ids.extend(encoded.generated_ids);
        self.time_stamp = Some(time_stamp);
        self.result.push(Proxy::new(address));
        Ok(&self.result[index])
    }

    /// Number of objects written so far.
    pub fn len(&self) -> usize {
        self.result.len()
    }

    pub fn is_empty(&self) -> bool {
        self.result.is_empty()
    }

    /// Closes the stream.
    ///
    /// A single written object yields [`SaveOutcome::Saved`]; any other
    /// count yields [`SaveOutcome::Batch`].
    pub fn finish(self) -> SaveOutcome {
        if self.result.len() == 1 {
            if let Some(proxy) = self.result.get(0) {
                return SaveOutcome::Saved {
                    address: proxy.address().clone(),
                    extrinsic_ids: self.generated_ids,
                    time_stamp: self.time_stamp.unwrap_or_else(Utc::now),
                };
            }
        }
        SaveOutcome::Batch {
            result: self.result,
            extrinsic_ids: self.generated_ids,
        }
    }
}

fn stamped(mut document: Document, time_stamp: DateTime<Utc>) -> Document {
    document.insert(TIME_STAMP_KEY.to_string(), Value::DateTime(time_stamp));
    document
}

type DocumentIter<'a> = Box<dyn Iterator<Item = Result<Document>> + 'a>;

/// A decoded root object. Yielded by [`InputStream`].
#[derive(Debug)]
pub struct Loaded {
    /// The address of the object's document.
    pub address: Address,
    pub object: Box<dyn Model>,
    pub extrinsic_ids: ExtrinsicIds,
    pub time_stamp: Option<DateTime<Utc>>,
}

/// Reads root objects from one address. Created by
/// [`Handler::create_input_stream`].
pub struct InputStream<'a> {
    documents: DocumentIter<'a>,
    decoder: Decoder<'a>,
    address: Address,
    collection: Address,
    index: usize,
}

impl InputStream<'_> {
    fn decode(&self, document: Document, path: &ObjectPath) -> Result<Loaded> {
        let decoded = self.decoder.decode(&document, path)?;
        let address = match &decoded.id {
            Some(id) => self.collection.with_id(id)?,
            None => self.address.clone(),
        };
        Ok(Loaded {
            address,
            object: decoded.object,
            extrinsic_ids: decoded.extrinsic_ids,
            time_stamp: decoded.time_stamp,
        })
    }
}

impl Iterator for InputStream<'_> {
    type Item = Result<Loaded>;

    fn next(&mut self) -> Option<Self::Item> {
        let document = self.documents.next()?;
        let path = ObjectPath::root(self.index);
        self.index += 1;
        Some(document.and_then(|document| self.decode(document, &path)))
    }
}
