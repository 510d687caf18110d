//! Object graph to document conversion.
//!
//! A root object becomes one document. Objects reached through containment
//! references are embedded as nested documents, or written as separate
//! sibling documents when a many-valued containment is larger than the
//! configured threshold. Every other reference is written as a proxy field
//! `{"_proxy": <address>, "_type": <type>}`.

use crate::address::{Address, AddressError};
use crate::coerce;
use crate::datum::Datum;
use crate::id::{NativeId, ObjectId};
use crate::model::{Class, LinkRef, Model};
use crate::options::Options;
use crate::resource::{ExtrinsicIds, ObjectPath};
use crate::value::{Document, EXTRINSIC_ID_KEY, ID_KEY, PROXY_KEY, TYPE_KEY, Value, is_reserved};

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("{class}.{name} uses a reserved field name")]
    ReservedName {
        class: &'static str,
        name: &'static str,
    },
    #[error("{class}.{name} holds {value:?}, which does not fit its type")]
    TypeMismatch {
        class: &'static str,
        name: &'static str,
        value: Datum,
    },
    #[error("{class}.{name} refers to an object that has no address")]
    UnaddressedReference {
        class: &'static str,
        name: &'static str,
    },
    #[error("{class}.{name} is single-valued but holds {count} links")]
    Cardinality {
        class: &'static str,
        name: &'static str,
        count: usize,
    },
    #[error("sibling documents need a collection address")]
    MissingCollection,
    #[error(transparent)]
    Address(#[from] AddressError),
}

/// A contained object stored as its own document.
#[derive(Debug, Clone)]
pub struct Sibling {
    pub id: ObjectId,
    /// The encoded object, `_id` first.
    pub document: Document,
}

/// Output of [`Encoder::encode`].
#[derive(Debug, Clone)]
pub struct Encoded {
    /// The root document. Starts with `_id` when the id was known.
    pub document: Document,
    pub id: Option<ObjectId>,
    /// Documents to be written alongside the root, in encounter order.
    pub siblings: Vec<Sibling>,
    /// Extrinsic ids created during this encoding.
    pub generated_ids: ExtrinsicIds,
}

/// Converts object graphs into documents. Does not touch any store.
pub struct Encoder<'a> {
    options: &'a Options,
    ids: &'a ExtrinsicIds,
    collection: Option<&'a Address>,
}

struct Walk {
    siblings: Vec<Sibling>,
    generated_ids: ExtrinsicIds,
}

impl<'a> Encoder<'a> {
    pub fn new(options: &'a Options, ids: &'a ExtrinsicIds) -> Self {
        Encoder {
            options,
            ids,
            collection: None,
        }
    }

    /// Sets the collection sibling documents are addressed in.
    pub fn with_collection(mut self, collection: &'a Address) -> Self {
        self.collection = Some(collection);
        self
    }

    /// Encodes `root`, found at `path` in its resource.
    ///
    /// `id` is the identifier from the target address; without one, the id
    /// attribute supplies it if `use_id_attribute_as_primary_key` is set.
    pub fn encode(
        &self,
        root: &dyn Model,
        path: &ObjectPath,
        id: Option<&ObjectId>,
    ) -> Result<Encoded, EncodeError> {
        let class = root.class();
        let id = match id {
            Some(id) => Some(id.clone()),
            None if self.options.use_id_attribute_as_primary_key => id_from_attribute(root, &class),
            None => None,
        };

        let mut walk = Walk {
            siblings: Vec::new(),
            generated_ids: ExtrinsicIds::new(),
        };
        let mut document = self.encode_object(root, &class, path, &mut walk)?;
        if let Some(id) = &id {
            document.shift_insert(0, ID_KEY.to_string(), id.to_value());
        }
        log::trace!("encoded {} at {} with {} siblings", class.name, path, walk.siblings.len());

        Ok(Encoded {
            document,
            id,
            siblings: walk.siblings,
            generated_ids: walk.generated_ids,
        })
    }

    fn encode_object(
        &self,
        object: &dyn Model,
        class: &Class,
        path: &ObjectPath,
        walk: &mut Walk,
    ) -> Result<Document, EncodeError> {
        let mut doc = Document::new();
        doc.insert(TYPE_KEY.to_string(), Value::String(class.name.to_string()));

        if let Some(xid) = self.extrinsic_id(path, walk) {
            doc.insert(EXTRINSIC_ID_KEY.to_string(), Value::String(xid));
        }

        for attr in &class.attributes {
            if is_reserved(attr.name) {
                return Err(EncodeError::ReservedName {
                    class: class.name,
                    name: attr.name,
                });
            }
            let Some(datum) = object.attribute(attr.name) else {
                continue;
            };
            if datum.is_null() || (!self.options.serialize_default_values && attr.is_default(&datum)) {
                continue;
            }
            let mismatch = |value: &Datum| EncodeError::TypeMismatch {
                class: class.name,
                name: attr.name,
                value: value.clone(),
            };
            let value = if attr.many {
                let Datum::Sequence(items) = &datum else {
                    return Err(mismatch(&datum));
                };
                let values = items
                    .iter()
                    .map(|item| coerce::to_value(&attr.data_type, item).ok_or_else(|| mismatch(item)))
                    .collect::<Result<Vec<_>, _>>()?;
                Value::Array(values)
            } else {
                coerce::to_value(&attr.data_type, &datum).ok_or_else(|| mismatch(&datum))?
            };
            doc.insert(attr.name.to_string(), value);
        }

        for reference in &class.references {
            if is_reserved(reference.name) {
                return Err(EncodeError::ReservedName {
                    class: class.name,
                    name: reference.name,
                });
            }
            let links = object.reference(reference.name);
            if links.is_empty() {
                continue;
            }
            if !reference.many && links.len() > 1 {
                return Err(EncodeError::Cardinality {
                    class: class.name,
                    name: reference.name,
                    count: links.len(),
                });
            }
            let as_siblings = reference.containment
                && reference.many
                && self.options.sibling_threshold.is_some_and(|t| links.len() > t);

            let mut values = Vec::with_capacity(links.len());
            for (index, link) in links.into_iter().enumerate() {
                let child_path = path.child(reference.name, reference.many.then_some(index));
                let value = match link {
                    LinkRef::Proxy(proxy) => {
                        let type_name = proxy
                            .target()
                            .map_or(reference.target, |target| target.class().name);
                        proxy_field(proxy.address(), type_name)
                    }
                    LinkRef::Object(child) if reference.containment => {
                        let child_class = child.class();
                        let child_doc = self.encode_object(child, &child_class, &child_path, walk)?;
                        if as_siblings {
                            self.sibling(child_doc, child_class.name, walk)?
                        } else {
                            Value::Document(child_doc)
                        }
                    }
                    LinkRef::Object(_) => {
                        return Err(EncodeError::UnaddressedReference {
                            class: class.name,
                            name: reference.name,
                        });
                    }
                };
                values.push(value);
            }

            let value = if reference.many {
                Value::Array(values)
            } else {
                values.swap_remove(0)
            };
            doc.insert(reference.name.to_string(), value);
        }

        Ok(doc)
    }

    fn extrinsic_id(&self, path: &ObjectPath, walk: &mut Walk) -> Option<String> {
        if let Some(xid) = self.ids.get(path) {
            return Some(xid.to_string());
        }
        if !self.options.generate_extrinsic_ids {
            return None;
        }
        let xid = uuid::Uuid::new_v4().to_string();
        walk.generated_ids.insert(path.clone(), xid.clone());
        Some(xid)
    }

    /// Moves an encoded child into its own document and returns the proxy
    /// field that replaces it.
    fn sibling(&self, mut document: Document, type_name: &str, walk: &mut Walk) -> Result<Value, EncodeError> {
        let collection = self.collection.ok_or(EncodeError::MissingCollection)?;
        let id = ObjectId::Native(NativeId::generate());
        let address = collection.with_id(&id)?;
        document.shift_insert(0, ID_KEY.to_string(), id.to_value());
        walk.siblings.push(Sibling { id, document });
        Ok(proxy_field(&address, type_name))
    }
}

/// The field stored in place of a referenced object.
pub fn proxy_field(address: &Address, type_name: &str) -> Value {
    let mut doc = Document::new();
    doc.insert(PROXY_KEY.to_string(), Value::String(address.to_string()));
    doc.insert(TYPE_KEY.to_string(), Value::String(type_name.to_string()));
    Value::Document(doc)
}

fn id_from_attribute(object: &dyn Model, class: &Class) -> Option<ObjectId> {
    let attr = class.id_attribute()?;
    let text = match object.attribute(attr.name)? {
        Datum::Unicode(s) | Datum::BigInt(s) | Datum::Enum(s) => s,
        Datum::Char(c) => c.to_string(),
        Datum::I8(v) => v.to_string(),
        Datum::I16(v) => v.to_string(),
        Datum::I32(v) => v.to_string(),
        Datum::I64(v) => v.to_string(),
        _ => return None,
    };
    ObjectId::from_segment(&text)
}
