use chrono::{DateTime, Utc};

use crate::address::Address;
use crate::coerce;
use crate::datum::Datum;
use crate::id::ObjectId;
use crate::model::{AttributeDef, Link, Model, ModelError, ReferenceDef, Registry};
use crate::proxy::Proxy;
use crate::resource::{ExtrinsicIds, ObjectPath};
use crate::value::{
    Document, EXTRINSIC_ID_KEY, ID_KEY, PROXY_KEY, TIME_STAMP_KEY, TYPE_KEY, Value, is_reserved,
};

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("no registered type named {0:?}")]
    UnknownType(String),
    #[error("corrupt document: {0}")]
    CorruptDocument(String),
    #[error(transparent)]
    Model(#[from] ModelError),
}

fn corrupt(message: impl Into<String>) -> DecodeError {
    DecodeError::CorruptDocument(message.into())
}

/// Output of [`Decoder::decode`].
#[derive(Debug)]
pub struct Decoded {
    pub object: Box<dyn Model>,
    /// The document's `_id`, if it has one.
    pub id: Option<ObjectId>,
    /// Extrinsic ids found in the document and its embedded objects.
    pub extrinsic_ids: ExtrinsicIds,
    /// The document's `_timeStamp`, if it has one.
    pub time_stamp: Option<DateTime<Utc>>,
}

/// Rebuilds objects from documents.
///
/// References stored as proxy fields come back as unresolved proxies;
/// nothing is fetched from a store.
pub struct Decoder<'a> {
    registry: &'a Registry,
}

impl<'a> Decoder<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Decoder { registry }
    }

    /// Decodes a root document found at `path` in its resource.
    pub fn decode(&self, document: &Document, path: &ObjectPath) -> Result<Decoded, DecodeError> {
        let mut extrinsic_ids = ExtrinsicIds::new();
        let object = self.decode_object(document, path, &mut extrinsic_ids)?;
        let id = document.get(ID_KEY).and_then(ObjectId::from_value);
        let time_stamp = match document.get(TIME_STAMP_KEY) {
            Some(Value::DateTime(instant)) => Some(*instant),
            _ => None,
        };
        log::trace!("decoded {} at {}", object.class().name, path);
        Ok(Decoded {
            object,
            id,
            extrinsic_ids,
            time_stamp,
        })
    }

    fn decode_object(
        &self,
        document: &Document,
        path: &ObjectPath,
        extrinsic_ids: &mut ExtrinsicIds,
    ) -> Result<Box<dyn Model>, DecodeError> {
        let type_name = match document.get(TYPE_KEY) {
            Some(Value::String(name)) => name,
            Some(other) => return Err(corrupt(format!("{path}: _type is a {}", other.kind()))),
            None => return Err(corrupt(format!("{path}: missing _type"))),
        };
        let mut object = self
            .registry
            .create(type_name)
            .ok_or_else(|| DecodeError::UnknownType(type_name.clone()))?;
        let class = object.class();

        match document.get(EXTRINSIC_ID_KEY) {
            Some(Value::String(xid)) => {
                extrinsic_ids.insert(path.clone(), xid.clone());
            }
            Some(other) => return Err(corrupt(format!("{path}: _xid is a {}", other.kind()))),
            None => {}
        }

        for (key, value) in document {
            if is_reserved(key) {
                continue;
            }
            if let Some(attr) = class.find_attribute(key) {
                if let Some(datum) = decode_attribute(class.name, attr, value)? {
                    object.set_attribute(attr.name, datum)?;
                }
            } else if let Some(reference) = class.find_reference(key) {
                let links = self.decode_reference(class.name, reference, value, path, extrinsic_ids)?;
                object.set_reference(reference.name, links)?;
            } else {
                log::debug!("skipping unknown field {key} of {} at {path}", class.name);
            }
        }

        Ok(object)
    }

    fn decode_reference(
        &self,
        class: &str,
        reference: &ReferenceDef,
        value: &Value,
        path: &ObjectPath,
        extrinsic_ids: &mut ExtrinsicIds,
    ) -> Result<Vec<Link>, DecodeError> {
        let items: &[Value] = match value {
            Value::Null => &[],
            Value::Array(items) if reference.many => items,
            other if !reference.many => std::slice::from_ref(other),
            other => {
                return Err(corrupt(format!(
                    "{class}.{}: expected array, found {}",
                    reference.name,
                    other.kind()
                )));
            }
        };

        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let Value::Document(doc) = item else {
                    return Err(corrupt(format!(
                        "{class}.{}: expected document, found {}",
                        reference.name,
                        item.kind()
                    )));
                };
                match doc.get(PROXY_KEY) {
                    Some(Value::String(text)) => {
                        let address = Address::parse(text)
                            .map_err(|e| corrupt(format!("{class}.{}: {e}", reference.name)))?;
                        Ok(Link::Proxy(Proxy::new(address)))
                    }
                    Some(other) => Err(corrupt(format!(
                        "{class}.{}: _proxy is a {}",
                        reference.name,
                        other.kind()
                    ))),
                    None => {
                        let child_path = path.child(reference.name, reference.many.then_some(index));
                        let child = self.decode_object(doc, &child_path, extrinsic_ids)?;
                        Ok(Link::Object(child))
                    }
                }
            })
            .collect()
    }
}

/// Converts a stored attribute value. `Null` reads as unset.
fn decode_attribute(class: &str, attr: &AttributeDef, value: &Value) -> Result<Option<Datum>, DecodeError> {
    if matches!(value, Value::Null) {
        return Ok(None);
    }
    let mismatch = |found: &Value| {
        corrupt(format!(
            "{class}.{}: cannot read {} as {:?}",
            attr.name,
            found.kind(),
            attr.data_type
        ))
    };
    if attr.many {
        let Value::Array(items) = value else {
            return Err(mismatch(value));
        };
        let items = items
            .iter()
            .map(|item| coerce::from_value(&attr.data_type, item).ok_or_else(|| mismatch(item)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(Datum::Sequence(items)))
    } else {
        coerce::from_value(&attr.data_type, value)
            .map(Some)
            .ok_or_else(|| mismatch(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::Encoder;
    use crate::fixtures::{self, Note};
    use crate::options::Options;

    fn note_doc(title: &str) -> Document {
        let mut doc = Document::new();
        doc.insert(TYPE_KEY.into(), Value::String("Note".into()));
        doc.insert("title".into(), Value::String(title.into()));
        doc
    }

    fn decode(doc: &Document) -> Result<Decoded, DecodeError> {
        let registry = fixtures::registry();
        Decoder::new(&registry).decode(doc, &ObjectPath::root(0))
    }

    #[test]
    fn decodes_attributes() {
        let mut doc = note_doc("hello");
        doc.insert("count".into(), Value::Int32(3));
        doc.insert("score".into(), Value::Int32(2));
        doc.insert("tags".into(), Value::Array(vec![Value::String("x".into())]));
        let decoded = decode(&doc).unwrap();
        let note = decoded.object.downcast_ref::<Note>().unwrap();
        assert_eq!(note.title.as_deref(), Some("hello"));
        assert_eq!(note.count, 3);
        assert_eq!(note.score, 2.0);
        assert_eq!(note.tags, vec!["x".to_string()]);
        assert!(decoded.id.is_none());
    }

    #[test]
    fn missing_type_is_corrupt() {
        let mut doc = note_doc("a");
        doc.shift_remove(TYPE_KEY);
        assert!(matches!(decode(&doc), Err(DecodeError::CorruptDocument(_))));

        doc.insert(TYPE_KEY.into(), Value::Int32(1));
        assert!(matches!(decode(&doc), Err(DecodeError::CorruptDocument(_))));
    }

    #[test]
    fn unknown_type() {
        let mut doc = note_doc("a");
        doc.insert(TYPE_KEY.into(), Value::String("Ghost".into()));
        assert!(matches!(decode(&doc), Err(DecodeError::UnknownType(name)) if name == "Ghost"));
    }

    #[test]
    fn shape_mismatch_is_corrupt() {
        let mut doc = note_doc("a");
        doc.insert("count".into(), Value::String("three".into()));
        assert!(matches!(decode(&doc), Err(DecodeError::CorruptDocument(_))));

        let mut doc = note_doc("a");
        doc.insert("tags".into(), Value::String("x".into()));
        assert!(matches!(decode(&doc), Err(DecodeError::CorruptDocument(_))));
    }

    #[test]
    fn unknown_fields_are_skipped() {
        let mut doc = note_doc("a");
        doc.insert("retired".into(), Value::Bool(true));
        assert!(decode(&doc).is_ok());
    }

    #[test]
    fn proxies_stay_unresolved() {
        let target = "resin://localhost/data/notes/4d0a3e259095b5b334a59df0";
        let mut proxy = Document::new();
        proxy.insert(PROXY_KEY.into(), Value::String(target.into()));
        proxy.insert(TYPE_KEY.into(), Value::String("Note".into()));
        let mut doc = note_doc("a");
        doc.insert("see_also".into(), Value::Array(vec![Value::Document(proxy)]));

        let decoded = decode(&doc).unwrap();
        let note = decoded.object.downcast_ref::<Note>().unwrap();
        let proxy = note.see_also[0].as_proxy().unwrap();
        assert!(!proxy.is_resolved());
        assert_eq!(proxy.address().to_string(), target);
    }

    #[test]
    fn bad_proxy_address_is_corrupt() {
        let mut proxy = Document::new();
        proxy.insert(PROXY_KEY.into(), Value::String("no scheme".into()));
        let mut doc = note_doc("a");
        doc.insert("see_also".into(), Value::Array(vec![Value::Document(proxy)]));
        assert!(matches!(decode(&doc), Err(DecodeError::CorruptDocument(_))));
    }

    #[test]
    fn reads_id_and_time_stamp() {
        let mut doc = note_doc("a");
        doc.shift_insert(0, ID_KEY.into(), Value::String("ID".into()));
        let now = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        doc.insert(TIME_STAMP_KEY.into(), Value::DateTime(now));
        let decoded = decode(&doc).unwrap();
        assert_eq!(decoded.id, Some(ObjectId::External("ID".into())));
        assert_eq!(decoded.time_stamp, Some(now));
    }

    #[test]
    fn encode_decode_encode_is_stable() {
        let mut note = Note::titled("root").with_child(Note::titled("child"));
        note.count = 9;
        note.tags = vec!["a".into(), "b".into()];
        let mut ids = ExtrinsicIds::new();
        ids.insert(ObjectPath::root(0), "r");
        ids.insert(ObjectPath::root(0).child("children", Some(0)), "c");

        let options = Options::default();
        let first = Encoder::new(&options, &ids)
            .encode(&note, &ObjectPath::root(0), None)
            .unwrap();
        let decoded = decode(&first.document).unwrap();
        assert_eq!(decoded.extrinsic_ids, ids);

        let second = Encoder::new(&options, &decoded.extrinsic_ids)
            .encode(decoded.object.as_ref(), &ObjectPath::root(0), None)
            .unwrap();
        assert_eq!(second.document, first.document);
    }
}
