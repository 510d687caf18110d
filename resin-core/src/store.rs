use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use indexmap::IndexMap;

use crate::id::{NativeId, ObjectId};
use crate::value::{Document, ID_KEY};

/// Selects one collection on one store server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace {
    store_url: String,
    database: String,
    collection: String,
}

impl Namespace {
    pub fn new(store_url: impl Into<String>, database: &str, collection: &str) -> Self {
        Namespace {
            store_url: store_url.into(),
            database: database.to_string(),
            collection: collection.to_string(),
        }
    }

    /// `host[:port]` of the server.
    pub fn store_url(&self) -> &str {
        &self.store_url
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}.{}", self.store_url, self.database, self.collection)
    }
}

/// Documents yielded by [`DocumentStore::scan`].
pub type Cursor<'a, E> = Box<dyn Iterator<Item = Result<Document, E>> + 'a>;

/// A document-oriented store addressed by namespace and identifier.
///
/// Stores operate on whole documents: encoding objects into documents is
/// handled by higher layers. Every stored document carries its identifier
/// in the `_id` field, placed first.
///
/// All methods take `&self` to support stores with internal locking (e.g., RocksDB).
pub trait DocumentStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Inserts a new document and returns its identifier.
    ///
    /// A document without `_id` receives a freshly generated native id.
    fn insert(&self, ns: &Namespace, document: Document) -> Result<ObjectId, Self::Error>;

    /// Inserts or replaces the document with the given identifier.
    fn upsert(&self, ns: &Namespace, id: &ObjectId, document: Document) -> Result<(), Self::Error>;

    /// Retrieves a document by identifier, or None if not present.
    fn find_one(&self, ns: &Namespace, id: &ObjectId) -> Result<Option<Document>, Self::Error>;

    /// Removes a document, returning it if it was present.
    fn find_and_remove(&self, ns: &Namespace, id: &ObjectId) -> Result<Option<Document>, Self::Error>;

    /// Iterates over every document of a collection.
    fn scan<'a>(&'a self, ns: &Namespace) -> Result<Cursor<'a, Self::Error>, Self::Error>;
}

impl<S: DocumentStore + ?Sized> DocumentStore for &S {
    type Error = S::Error;

    fn insert(&self, ns: &Namespace, document: Document) -> Result<ObjectId, Self::Error> {
        (**self).insert(ns, document)
    }

    fn upsert(&self, ns: &Namespace, id: &ObjectId, document: Document) -> Result<(), Self::Error> {
        (**self).upsert(ns, id, document)
    }

    fn find_one(&self, ns: &Namespace, id: &ObjectId) -> Result<Option<Document>, Self::Error> {
        (**self).find_one(ns, id)
    }

    fn find_and_remove(&self, ns: &Namespace, id: &ObjectId) -> Result<Option<Document>, Self::Error> {
        (**self).find_and_remove(ns, id)
    }

    fn scan<'a>(&'a self, ns: &Namespace) -> Result<Cursor<'a, Self::Error>, Self::Error> {
        (**self).scan(ns)
    }
}

/// Places `id` in the leading `_id` field of `document`.
pub fn with_document_id(mut document: Document, id: &ObjectId) -> Document {
    document.shift_remove(ID_KEY);
    document.shift_insert(0, ID_KEY.to_string(), id.to_value());
    document
}

/// Reads the identifier a document carries, if any.
pub fn document_id(document: &Document) -> Option<ObjectId> {
    document.get(ID_KEY).and_then(ObjectId::from_value)
}

#[derive(Debug, thiserror::Error)]
pub enum MemoryStoreError {
    #[error("duplicate key {id} in {namespace}")]
    DuplicateKey { namespace: Namespace, id: ObjectId },
    #[error("invalid _id field in document for {0}")]
    InvalidId(Namespace),
    #[error("store unavailable")]
    Unavailable,
}

type Collection = IndexMap<ObjectId, Document>;

/// An in-memory document store.
///
/// Useful for testing and as a reference implementation. Collections keep
/// insertion order, so a scan returns documents in the order they were
/// first written.
#[derive(Debug)]
pub struct MemoryStore {
    data: RwLock<HashMap<Namespace, Collection>>,
    available: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore {
            data: RwLock::default(),
            available: AtomicBool::new(true),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates losing (or regaining) the connection to the server.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of documents in a collection.
    pub fn count(&self, ns: &Namespace) -> usize {
        self.data.read().unwrap().get(ns).map_or(0, IndexMap::len)
    }

    fn check(&self) -> Result<(), MemoryStoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(MemoryStoreError::Unavailable)
        }
    }
}

impl DocumentStore for MemoryStore {
    type Error = MemoryStoreError;

    fn insert(&self, ns: &Namespace, document: Document) -> Result<ObjectId, Self::Error> {
        self.check()?;
        let id = match document.get(ID_KEY) {
            Some(value) => {
                ObjectId::from_value(value).ok_or_else(|| MemoryStoreError::InvalidId(ns.clone()))?
            }
            None => ObjectId::Native(NativeId::generate()),
        };
        let mut data = self.data.write().unwrap();
        let collection = data.entry(ns.clone()).or_default();
        if collection.contains_key(&id) {
            return Err(MemoryStoreError::DuplicateKey {
                namespace: ns.clone(),
                id,
            });
        }
        collection.insert(id.clone(), with_document_id(document, &id));
        Ok(id)
    }

    fn upsert(&self, ns: &Namespace, id: &ObjectId, document: Document) -> Result<(), Self::Error> {
        self.check()?;
        self.data
            .write()
            .unwrap()
            .entry(ns.clone())
            .or_default()
            .insert(id.clone(), with_document_id(document, id));
        Ok(())
    }

    fn find_one(&self, ns: &Namespace, id: &ObjectId) -> Result<Option<Document>, Self::Error> {
        self.check()?;
        Ok(self
            .data
            .read()
            .unwrap()
            .get(ns)
            .and_then(|collection| collection.get(id))
            .cloned())
    }

    fn find_and_remove(&self, ns: &Namespace, id: &ObjectId) -> Result<Option<Document>, Self::Error> {
        self.check()?;
        Ok(self
            .data
            .write()
            .unwrap()
            .get_mut(ns)
            .and_then(|collection| collection.shift_remove(id)))
    }

    fn scan<'a>(&'a self, ns: &Namespace) -> Result<Cursor<'a, Self::Error>, Self::Error> {
        self.check()?;
        let snapshot: Vec<Document> = self
            .data
            .read()
            .unwrap()
            .get(ns)
            .map(|collection| collection.values().cloned().collect())
            .unwrap_or_default();
        Ok(Box::new(snapshot.into_iter().map(Ok)))
    }
}
