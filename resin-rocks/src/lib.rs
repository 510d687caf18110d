//! RocksDB-backed document store for Resin.
//!
//! Every document lives under one key built from its namespace and
//! identifier:
//!
//! ```text
//! store_url \0 database \0 collection \0 ('n' 12 bytes | 'x' utf-8)
//! ```
//!
//! Values are the CBOR encoding of the document. A scan walks the keys of
//! one collection, so documents come back in key order. Addresses never
//! carry NUL in a namespace part, so the separators are unambiguous.

use std::path::Path;
use std::sync::Mutex;

use resin_core::{Cursor, Document, DocumentStore, ID_KEY, NativeId, Namespace, ObjectId, with_document_id};
use rocksdb::{DB, Direction, IteratorMode, Options};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RocksError {
    #[error("RocksDB error: {0}")]
    Db(#[from] rocksdb::Error),
    #[error("encoding error: {0}")]
    Encoding(String),
    #[error("duplicate key {0}")]
    DuplicateKey(ObjectId),
    #[error("invalid _id field in document for {0}")]
    InvalidId(Namespace),
}

/// A persistent document store backed by RocksDB.
pub struct RocksStore {
    db: DB,
    // Held by every write, so read-then-write sequences are atomic.
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Opens a RocksDB store at the given path.
    ///
    /// Creates the database if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RocksError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;
        Ok(Self {
            db,
            write_lock: Mutex::new(()),
        })
    }

    fn put(&self, key: &[u8], document: &Document) -> Result<(), RocksError> {
        let mut bytes = Vec::new();
        ciborium::into_writer(document, &mut bytes)
            .map_err(|e| RocksError::Encoding(format!("write error: {}", e)))?;
        self.db.put(key, bytes)?;
        Ok(())
    }
}

fn namespace_prefix(ns: &Namespace) -> Vec<u8> {
    let mut prefix = Vec::new();
    for part in [ns.store_url(), ns.database(), ns.collection()] {
        prefix.extend_from_slice(part.as_bytes());
        prefix.push(0);
    }
    prefix
}

fn document_key(ns: &Namespace, id: &ObjectId) -> Vec<u8> {
    let mut key = namespace_prefix(ns);
    match id {
        ObjectId::Native(native) => {
            key.push(b'n');
            key.extend_from_slice(native.as_bytes());
        }
        ObjectId::External(text) => {
            key.push(b'x');
            key.extend_from_slice(text.as_bytes());
        }
    }
    key
}

fn decode(bytes: &[u8]) -> Result<Document, RocksError> {
    ciborium::from_reader(bytes).map_err(|e| RocksError::Encoding(format!("read error: {}", e)))
}

impl DocumentStore for RocksStore {
    type Error = RocksError;

    fn insert(&self, ns: &Namespace, document: Document) -> Result<ObjectId, Self::Error> {
        let id = match document.get(ID_KEY) {
            Some(value) => ObjectId::from_value(value).ok_or_else(|| RocksError::InvalidId(ns.clone()))?,
            None => ObjectId::Native(NativeId::generate()),
        };
        let key = document_key(ns, &id);

        let _guard = self.write_lock.lock().unwrap();
        if self.db.get_pinned(&key)?.is_some() {
            return Err(RocksError::DuplicateKey(id));
        }
        self.put(&key, &with_document_id(document, &id))?;
        Ok(id)
    }

    fn upsert(&self, ns: &Namespace, id: &ObjectId, document: Document) -> Result<(), Self::Error> {
        let _guard = self.write_lock.lock().unwrap();
        self.put(&document_key(ns, id), &with_document_id(document, id))
    }

    fn find_one(&self, ns: &Namespace, id: &ObjectId) -> Result<Option<Document>, Self::Error> {
        self.db
            .get_pinned(document_key(ns, id))?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    fn find_and_remove(&self, ns: &Namespace, id: &ObjectId) -> Result<Option<Document>, Self::Error> {
        let key = document_key(ns, id);
        let _guard = self.write_lock.lock().unwrap();
        let Some(bytes) = self.db.get(&key)? else {
            return Ok(None);
        };
        self.db.delete(&key)?;
        decode(&bytes).map(Some)
    }

    fn scan<'a>(&'a self, ns: &Namespace) -> Result<Cursor<'a, Self::Error>, Self::Error> {
        let prefix = namespace_prefix(ns);
        let entries = self.db.iterator(IteratorMode::From(&prefix, Direction::Forward));
        let documents = entries
            .take_while(move |entry| match entry {
                Ok((key, _)) => key.starts_with(&prefix),
                Err(_) => true,
            })
            .map(|entry| {
                let (_, value) = entry?;
                decode(&value)
            });
        Ok(Box::new(documents))
    }
}
