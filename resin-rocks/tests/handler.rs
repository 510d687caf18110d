use std::sync::Arc;

use resin_core::{
    Address, AttributeDef, Class, DataType, Datum, DocumentStore, Error, Handler, IntType, Link,
    LinkRef, Model, ModelError, Options, Proxy, ReferenceDef, Registry, Resource,
};
use resin_rocks::RocksStore;
use tempfile::TempDir;

#[derive(Debug, Default)]
struct Item {
    label: String,
    weight: i64,
    parts: Vec<Link>,
}

impl Item {
    fn new(label: &str, weight: i64) -> Self {
        Item {
            label: label.to_string(),
            weight,
            parts: Vec::new(),
        }
    }
}

impl Model for Item {
    fn class(&self) -> Class {
        Class::new("Item")
            .attribute(AttributeDef::new("label", DataType::Unicode))
            .attribute(AttributeDef::new("weight", DataType::Int(IntType::I64)))
            .reference(ReferenceDef::containment("parts", "Item").many())
    }

    fn attribute(&self, name: &str) -> Option<Datum> {
        match name {
            "label" => Some(Datum::from(self.label.as_str())),
            "weight" => Some(Datum::from(self.weight)),
            _ => None,
        }
    }

    fn set_attribute(&mut self, name: &str, value: Datum) -> Result<(), ModelError> {
        match (name, value) {
            ("label", Datum::Unicode(v)) => self.label = v,
            ("weight", Datum::I64(v)) => self.weight = v,
            (name, value) => return Err(ModelError::mismatch("Item", name, value)),
        }
        Ok(())
    }

    fn reference(&self, name: &str) -> Vec<LinkRef<'_>> {
        match name {
            "parts" => self.parts.iter().map(Link::as_link_ref).collect(),
            _ => Vec::new(),
        }
    }

    fn set_reference(&mut self, name: &str, links: Vec<Link>) -> Result<(), ModelError> {
        match name {
            "parts" => self.parts = links,
            _ => return Err(ModelError::unknown_reference("Item", name)),
        }
        Ok(())
    }
}

fn setup() -> (Handler<RocksStore>, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = RocksStore::open(dir.path()).unwrap();
    let registry = Arc::new(Registry::builder().register_default::<Item>().build());
    (Handler::new(store, registry), dir)
}

fn items() -> Address {
    Address::parse("resin://localhost/warehouse/items/").unwrap()
}

#[test]
fn save_load_delete() {
    let (handler, _dir) = setup();
    let options = Options::default();

    let mut resource = Resource::new(items());
    resource.push(Item::new("crate", 12));
    let outcome = handler.save(&resource, &options).unwrap();
    resource.bind(outcome);
    assert!(handler.exists(resource.address(), &options));

    let loaded = handler.load(resource.address(), &options).unwrap();
    let item = loaded.root::<Item>().unwrap();
    assert_eq!(item.label, "crate");
    assert_eq!(item.weight, 12);
    assert!(loaded.time_stamp().is_some());

    handler.delete(resource.address(), &options).unwrap();
    assert!(!handler.exists(resource.address(), &options));
    assert!(handler.load(resource.address(), &options).unwrap().is_empty());
}

#[test]
fn batch_and_collection_load() {
    let (handler, _dir) = setup();
    let options = Options::default();

    let mut resource = Resource::new(items());
    for i in 0..5 {
        resource.push(Item::new(&format!("item {i}"), i));
    }
    let outcome = handler.save(&resource, &options).unwrap();
    resource.bind(outcome);
    assert_eq!(resource.batch_result().unwrap().len(), 5);

    let loaded = handler.load(&items(), &options).unwrap();
    let mut labels: Vec<_> = loaded
        .contents()
        .iter()
        .map(|object| object.downcast_ref::<Item>().unwrap().label.clone())
        .collect();
    labels.sort();
    assert_eq!(labels, vec!["item 0", "item 1", "item 2", "item 3", "item 4"]);
}

#[test]
fn siblings_resolve_from_disk() {
    let (handler, _dir) = setup();
    let options = Options::new().sibling_threshold(Some(1));

    let mut root = Item::new("pallet", 100);
    root.parts.push(Link::object(Item::new("box a", 10)));
    root.parts.push(Link::object(Item::new("box b", 20)));
    let mut resource = Resource::new(items());
    resource.push(root);
    let outcome = handler.save(&resource, &options).unwrap();
    resource.bind(outcome);

    let loaded = handler.load(resource.address(), &Options::default()).unwrap();
    let weights: Vec<_> = loaded
        .root::<Item>()
        .unwrap()
        .parts
        .iter()
        .map(|link| {
            let proxy: Proxy = handler.resolve(link.as_proxy().unwrap().clone()).unwrap();
            proxy.get::<Item>().unwrap().weight
        })
        .collect();
    assert_eq!(weights, vec![10, 20]);
}

#[test]
fn nul_in_collection_is_rejected() {
    let (handler, _dir) = setup();
    let options = Options::default();

    let mut resource = Resource::new(Address::parse("resin://localhost/warehouse/it%00ems/").unwrap());
    resource.push(Item::new("crate", 1));
    let err = handler.save(&resource, &options).unwrap_err();
    assert!(matches!(err, Error::MalformedAddress(_)));
}

#[test]
fn resave_and_delete_clean_up_siblings() {
    let (handler, _dir) = setup();
    let options = Options::new().sibling_threshold(Some(1));
    let count = |handler: &Handler<RocksStore>| {
        let ns = items().namespace().unwrap();
        handler.store().scan(&ns).unwrap().count()
    };

    let mut root = Item::new("pallet", 100);
    root.parts.push(Link::object(Item::new("box a", 10)));
    root.parts.push(Link::object(Item::new("box b", 20)));
    let mut resource = Resource::new(items());
    resource.push(root);
    for _ in 0..2 {
        let outcome = handler.save(&resource, &options).unwrap();
        resource.bind(outcome);
        assert_eq!(count(&handler), 3);
    }

    handler.delete(resource.address(), &options).unwrap();
    assert_eq!(count(&handler), 0);
}
