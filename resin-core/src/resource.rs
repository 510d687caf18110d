use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::address::Address;
use crate::batch::BatchResult;
use crate::model::Model;

/// Locates an object inside a resource.
///
/// Root objects are `/0`, `/1`, ...; a contained object appends
/// `/@reference` for a single-valued reference or `/@reference.index` for a
/// many-valued one, e.g. `/0/@children.2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectPath(String);

impl ObjectPath {
    pub fn root(index: usize) -> Self {
        ObjectPath(format!("/{index}"))
    }

    pub fn child(&self, reference: &str, index: Option<usize>) -> Self {
        match index {
            Some(index) => ObjectPath(format!("{}/@{}.{}", self.0, reference, index)),
            None => ObjectPath(format!("{}/@{}", self.0, reference)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extrinsic identifiers of the objects in a resource, keyed by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtrinsicIds(BTreeMap<ObjectPath, String>);

impl ExtrinsicIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &ObjectPath) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    pub fn insert(&mut self, path: ObjectPath, id: impl Into<String>) -> Option<String> {
        self.0.insert(path, id.into())
    }

    pub fn remove(&mut self, path: &ObjectPath) -> Option<String> {
        self.0.remove(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ObjectPath, &str)> {
        self.0.iter().map(|(path, id)| (path, id.as_str()))
    }
}

impl Extend<(ObjectPath, String)> for ExtrinsicIds {
    fn extend<I: IntoIterator<Item = (ObjectPath, String)>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for ExtrinsicIds {
    type Item = (ObjectPath, String);
    type IntoIter = std::collections::btree_map::IntoIter<ObjectPath, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Result of a save, to be applied with [`Resource::bind`].
#[derive(Debug, Clone)]
pub enum SaveOutcome {
    /// A single object was written to `address`.
    Saved {
        address: Address,
        extrinsic_ids: ExtrinsicIds,
        time_stamp: DateTime<Utc>,
    },
    /// Several objects were written into a collection.
    Batch {
        result: BatchResult,
        extrinsic_ids: ExtrinsicIds,
    },
}

impl SaveOutcome {
    /// The address written for a single object.
    pub fn address(&self) -> Option<&Address> {
        match self {
            SaveOutcome::Saved { address, .. } => Some(address),
            SaveOutcome::Batch { .. } => None,
        }
    }

    pub fn batch_result(&self) -> Option<&BatchResult> {
        match self {
            SaveOutcome::Saved { .. } => None,
            SaveOutcome::Batch { result, .. } => Some(result),
        }
    }

    pub fn extrinsic_ids(&self) -> &ExtrinsicIds {
        match self {
            SaveOutcome::Saved { extrinsic_ids, .. } => extrinsic_ids,
            SaveOutcome::Batch { extrinsic_ids, .. } => extrinsic_ids,
        }
    }
}

/// A unit of persistence: an address plus the root objects stored there.
#[derive(Debug)]
pub struct Resource {
    address: Address,
    contents: Vec<Box<dyn Model>>,
    extrinsic_ids: ExtrinsicIds,
    time_stamp: Option<DateTime<Utc>>,
    batch: Option<BatchResult>,
}

impl Resource {
    pub fn new(address: Address) -> Self {
        Resource {
            address,
            contents: Vec::new(),
            extrinsic_ids: ExtrinsicIds::new(),
            time_stamp: None,
            batch: None,
        }
    }

    pub fn with_contents(address: Address, contents: Vec<Box<dyn Model>>) -> Self {
        Resource {
            contents,
            ..Resource::new(address)
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn set_address(&mut self, address: Address) {
        self.address = address;
    }

    pub fn push(&mut self, object: impl Model) {
        self.contents.push(Box::new(object));
    }

    pub fn push_boxed(&mut self, object: Box<dyn Model>) {
        self.contents.push(object);
    }

    pub fn contents(&self) -> &[Box<dyn Model>] {
        &self.contents
    }

    pub fn contents_mut(&mut self) -> &mut Vec<Box<dyn Model>> {
        &mut self.contents
    }

    pub fn into_contents(self) -> Vec<Box<dyn Model>> {
        self.contents
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// The first root object, if it is a `T`.
    pub fn root<T: Model>(&self) -> Option<&T> {
        self.get(0)
    }

    /// The root object at `index`, if it is a `T`.
    pub fn get<T: Model>(&self, index: usize) -> Option<&T> {
        self.contents.get(index).and_then(|object| object.downcast_ref::<T>())
    }

    pub fn extrinsic_ids(&self) -> &ExtrinsicIds {
        &self.extrinsic_ids
    }

    /// The extrinsic id of the object at `path`.
    pub fn id_of(&self, path: &ObjectPath) -> Option<&str> {
        self.extrinsic_ids.get(path)
    }

    pub fn set_id(&mut self, path: ObjectPath, id: impl Into<String>) {
        self.extrinsic_ids.insert(path, id);
    }

    /// When the first root document was last saved, as read back by a load.
    pub fn time_stamp(&self) -> Option<DateTime<Utc>> {
        self.time_stamp
    }

    /// The result of a bound batch save or a collection load.
    pub fn batch_result(&self) -> Option<&BatchResult> {
        self.batch.as_ref()
    }

    /// Applies the outcome of a save.
    ///
    /// A single-object save moves the resource to the address written,
    /// which carries the store-assigned id when none was given. A batch
    /// save moves the contents into the resolved proxies of the batch
    /// result, which becomes the resource's only content.
    pub fn bind(&mut self, outcome: SaveOutcome) {
        match outcome {
            SaveOutcome::Saved {
                address,
                extrinsic_ids,
                time_stamp,
            } => {
                self.address = address;
                self.extrinsic_ids.extend(extrinsic_ids);
                self.time_stamp = Some(time_stamp);
            }
            SaveOutcome::Batch {
                result,
                extrinsic_ids,
            } => {
                let objects = std::mem::take(&mut self.contents);
                self.extrinsic_ids.extend(extrinsic_ids);
                self.batch = Some(result.attach(objects));
            }
        }
    }

    pub(crate) fn absorb(
        &mut self,
        object: Box<dyn Model>,
        extrinsic_ids: ExtrinsicIds,
        time_stamp: Option<DateTime<Utc>>,
    ) {
        if self.contents.is_empty() {
            self.time_stamp = time_stamp;
        }
        self.contents.push(object);
        self.extrinsic_ids.extend(extrinsic_ids);
    }

    pub(crate) fn set_batch(&mut self, result: BatchResult) {
        self.batch = Some(result);
    }
}
