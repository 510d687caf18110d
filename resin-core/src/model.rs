use std::any::Any;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::OnceLock;

use crate::classify::{DataType, FloatType, IntType};
use crate::datum::Datum;
use crate::proxy::Proxy;

/// Describes one attribute of a class.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDef {
    pub name: &'static str,
    pub data_type: DataType,
    /// Many-valued attributes exchange `Datum::Sequence` values.
    pub many: bool,
    /// Explicit default; falls back to the natural default of the type.
    pub default: Option<Datum>,
    /// Marks the attribute that can act as the document's primary key.
    pub id: bool,
}

impl AttributeDef {
    pub fn new(name: &'static str, data_type: DataType) -> Self {
        AttributeDef {
            name,
            data_type,
            many: false,
            default: None,
            id: false,
        }
    }

    pub fn many(mut self) -> Self {
        self.many = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<Datum>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn id(mut self) -> Self {
        self.id = true;
        self
    }

    /// The value an unset attribute holds.
    ///
    /// Non-nullable booleans and numbers default to `false`/zero; other
    /// types have no default unless one was declared.
    pub fn default_value(&self) -> Option<Datum> {
        if let Some(default) = &self.default {
            return Some(default.clone());
        }
        if self.many {
            return None;
        }
        Some(match self.data_type {
            DataType::Bool => Datum::Bool(false),
            DataType::Char => Datum::Char('\0'),
            DataType::Int(IntType::I8) => Datum::I8(0),
            DataType::Int(IntType::I16) => Datum::I16(0),
            DataType::Int(IntType::I32) => Datum::I32(0),
            DataType::Int(IntType::I64) => Datum::I64(0),
            DataType::Float(FloatType::F32) => Datum::F32(0.0),
            DataType::Float(FloatType::F64) => Datum::F64(0.0),
            _ => return None,
        })
    }

    /// Returns true if `value` is indistinguishable from the unset state.
    pub fn is_default(&self, value: &Datum) -> bool {
        match value {
            Datum::Null => true,
            Datum::Sequence(items) if self.many => items.is_empty(),
            _ => self.default_value().is_some_and(|d| d.same_as(value)),
        }
    }
}

/// Describes one reference of a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceDef {
    pub name: &'static str,
    /// Type name of the referenced objects.
    pub target: &'static str,
    pub many: bool,
    /// Containment references own their targets; cross-references do not.
    pub containment: bool,
}

impl ReferenceDef {
    /// An owning reference whose targets are embedded in the owner.
    pub fn containment(name: &'static str, target: &'static str) -> Self {
        ReferenceDef {
            name,
            target,
            many: false,
            containment: true,
        }
    }

    /// A non-owning reference, persisted as an address.
    pub fn cross(name: &'static str, target: &'static str) -> Self {
        ReferenceDef {
            name,
            target,
            many: false,
            containment: false,
        }
    }

    pub fn many(mut self) -> Self {
        self.many = true;
        self
    }
}

/// The attribute and reference layout of a model type.
#[derive(Debug, Clone, PartialEq)]
pub struct Class {
    pub name: &'static str,
    pub attributes: Vec<AttributeDef>,
    pub references: Vec<ReferenceDef>,
}

impl Class {
    pub fn new(name: &'static str) -> Self {
        Class {
            name,
            attributes: Vec::new(),
            references: Vec::new(),
        }
    }

    pub fn attribute(mut self, def: AttributeDef) -> Self {
        self.attributes.push(def);
        self
    }

    pub fn reference(mut self, def: ReferenceDef) -> Self {
        self.references.push(def);
        self
    }

    pub fn find_attribute(&self, name: &str) -> Option<&AttributeDef> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn find_reference(&self, name: &str) -> Option<&ReferenceDef> {
        self.references.iter().find(|r| r.name == name)
    }

    /// The attribute flagged as primary key, if any.
    pub fn id_attribute(&self) -> Option<&AttributeDef> {
        self.attributes.iter().find(|a| a.id)
    }
}

/// Error raised by a model when a value does not fit.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("{class} has no attribute {name}")]
    UnknownAttribute { class: &'static str, name: String },
    #[error("{class} has no reference {name}")]
    UnknownReference { class: &'static str, name: String },
    #[error("{class}.{name} does not accept {value:?}")]
    TypeMismatch {
        class: &'static str,
        name: String,
        value: Datum,
    },
    #[error("{class}.{name} does not accept {count} links")]
    Cardinality {
        class: &'static str,
        name: String,
        count: usize,
    },
}

impl ModelError {
    pub fn unknown_attribute(class: &'static str, name: &str) -> Self {
        ModelError::UnknownAttribute {
            class,
            name: name.to_string(),
        }
    }

    pub fn unknown_reference(class: &'static str, name: &str) -> Self {
        ModelError::UnknownReference {
            class,
            name: name.to_string(),
        }
    }

    pub fn mismatch(class: &'static str, name: &str, value: Datum) -> Self {
        ModelError::TypeMismatch {
            class,
            name: name.to_string(),
            value,
        }
    }

    pub fn cardinality(class: &'static str, name: &str, count: usize) -> Self {
        ModelError::Cardinality {
            class,
            name: name.to_string(),
            count,
        }
    }
}

/// An owned reference value.
#[derive(Debug)]
pub enum Link {
    /// An object held in memory, owned by the referencing object.
    Object(Box<dyn Model>),
    /// An address-only reference to a stored document.
    Proxy(Proxy),
}

impl Link {
    pub fn object(value: impl Model) -> Self {
        Link::Object(Box::new(value))
    }

    pub fn as_link_ref(&self) -> LinkRef<'_> {
        match self {
            Link::Object(object) => LinkRef::Object(object.as_ref()),
            Link::Proxy(proxy) => LinkRef::Proxy(proxy),
        }
    }

    pub fn as_object(&self) -> Option<&(dyn Model + 'static)> {
        match self {
            Link::Object(object) => Some(object.as_ref()),
            Link::Proxy(_) => None,
        }
    }

    pub fn as_proxy(&self) -> Option<&Proxy> {
        match self {
            Link::Object(_) => None,
            Link::Proxy(proxy) => Some(proxy),
        }
    }
}

/// A borrowed reference value, as reported by [`Model::reference`].
#[derive(Debug, Clone, Copy)]
pub enum LinkRef<'a> {
    Object(&'a (dyn Model + 'static)),
    Proxy(&'a Proxy),
}

/// An object that can be persisted.
///
/// Implementations describe themselves through [`Class`] and exchange
/// attribute values as [`Datum`]s and reference values as [`Link`]s.
/// `attribute` returns `None` for an unset attribute.
pub trait Model: Any + Debug + Send + Sync {
    /// Returns the layout of this object's type.
    fn class(&self) -> Class;

    /// Reads an attribute.
    fn attribute(&self, name: &str) -> Option<Datum>;

    /// Writes an attribute.
    fn set_attribute(&mut self, name: &str, value: Datum) -> Result<(), ModelError>;

    /// Reads a reference. Single-valued references yield at most one link.
    fn reference(&self, _name: &str) -> Vec<LinkRef<'_>> {
        Vec::new()
    }

    /// Replaces the links of a reference.
    fn set_reference(&mut self, name: &str, _links: Vec<Link>) -> Result<(), ModelError> {
        Err(ModelError::unknown_reference(self.class().name, name))
    }
}

impl dyn Model {
    /// Returns the concrete object if it is a `T`.
    pub fn downcast_ref<T: Model>(&self) -> Option<&T> {
        let any: &dyn Any = self;
        any.downcast_ref::<T>()
    }

    /// Returns the type name recorded in documents for this object.
    pub fn type_name(&self) -> &'static str {
        self.class().name
    }
}

/// Creates an empty object of a registered type.
pub type Constructor = fn() -> Box<dyn Model>;

fn construct_default<T: Model + Default>() -> Box<dyn Model> {
    Box::new(T::default())
}

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// Maps the type names stored in documents to constructors.
///
/// Built once at startup and read-only afterward.
#[derive(Debug, Default)]
pub struct Registry {
    constructors: HashMap<&'static str, Constructor>,
}

/// Builder for [`Registry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    constructors: HashMap<&'static str, Constructor>,
}

impl RegistryBuilder {
    /// Registers a constructor under a type name.
    pub fn register(mut self, name: &'static str, constructor: Constructor) -> Self {
        self.constructors.insert(name, constructor);
        self
    }

    /// Registers `T` under the name its class reports.
    pub fn register_default<T: Model + Default>(self) -> Self {
        let name = T::default().class().name;
        self.register(name, construct_default::<T>)
    }

    pub fn build(self) -> Registry {
        Registry {
            constructors: self.constructors,
        }
    }
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Instantiates an empty object of the named type.
    pub fn create(&self, name: &str) -> Option<Box<dyn Model>> {
        self.constructors.get(name).map(|constructor| constructor())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    /// Installs this registry as the process-wide registry.
    ///
    /// Only the first call succeeds; later calls hand the registry back.
    pub fn install(self) -> Result<&'static Registry, Registry> {
        let mut candidate = Some(self);
        let installed = GLOBAL.get_or_init(|| candidate.take().unwrap_or_default());
        match candidate {
            None => Ok(installed),
            Some(rejected) => Err(rejected),
        }
    }

    /// The registry installed with [`Registry::install`], if any.
    pub fn global() -> Option<&'static Registry> {
        GLOBAL.get()
    }
}
