//! Models shared by the integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use resin_core::{
    Address, AttributeDef, Class, DataType, Datum, FloatType, Handler, IntType, Link, LinkRef,
    MemoryStore, Model, ModelError, ReferenceDef, Registry,
};

/// An object with a single string attribute.
#[derive(Debug, Default)]
pub struct TargetObject {
    pub single_attribute: Option<String>,
}

impl TargetObject {
    pub fn new(value: &str) -> Self {
        TargetObject {
            single_attribute: Some(value.to_string()),
        }
    }
}

impl Model for TargetObject {
    fn class(&self) -> Class {
        Class::new("TargetObject").attribute(AttributeDef::new("singleAttribute", DataType::Unicode))
    }

    fn attribute(&self, name: &str) -> Option<Datum> {
        match name {
            "singleAttribute" => self.single_attribute.clone().map(Datum::from),
            _ => None,
        }
    }

    fn set_attribute(&mut self, name: &str, value: Datum) -> Result<(), ModelError> {
        match name {
            "singleAttribute" => {
                self.single_attribute = value
                    .into_option()
                    .map_err(|v| ModelError::mismatch("TargetObject", name, v))?
            }
            _ => return Err(ModelError::unknown_attribute("TargetObject", name)),
        }
        Ok(())
    }
}

/// An object exercising every reference kind.
#[derive(Debug, Default)]
pub struct PrimaryObject {
    pub name: Option<String>,
    pub id_attribute: Option<String>,
    pub tags: Vec<String>,
    pub single_containment: Option<Link>,
    pub multiple_containment: Vec<Link>,
    pub single_reference: Option<Link>,
    pub multiple_references: Vec<Link>,
}

impl PrimaryObject {
    pub fn named(name: &str) -> Self {
        PrimaryObject {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }
}

impl Model for PrimaryObject {
    fn class(&self) -> Class {
        Class::new("PrimaryObject")
            .attribute(AttributeDef::new("name", DataType::Unicode))
            .attribute(AttributeDef::new("idAttribute", DataType::Unicode).id())
            .attribute(AttributeDef::new("tags", DataType::Unicode).many())
            .reference(ReferenceDef::containment("singleContainmentReference", "TargetObject"))
            .reference(ReferenceDef::containment("multipleContainmentReference", "TargetObject").many())
            .reference(ReferenceDef::cross("singleNonContainmentReference", "TargetObject"))
            .reference(ReferenceDef::cross("multipleNonContainmentReference", "TargetObject").many())
    }

    fn attribute(&self, name: &str) -> Option<Datum> {
        match name {
            "name" => self.name.clone().map(Datum::from),
            "idAttribute" => self.id_attribute.clone().map(Datum::from),
            "tags" => Some(Datum::Sequence(
                self.tags.iter().map(|t| Datum::from(t.as_str())).collect(),
            )),
            _ => None,
        }
    }

    fn set_attribute(&mut self, name: &str, value: Datum) -> Result<(), ModelError> {
        let mismatch = |v| ModelError::mismatch("PrimaryObject", name, v);
        match name {
            "name" => self.name = value.into_option().map_err(mismatch)?,
            "idAttribute" => self.id_attribute = value.into_option().map_err(mismatch)?,
            "tags" => self.tags = value.into_vec().map_err(mismatch)?,
            _ => return Err(ModelError::unknown_attribute("PrimaryObject", name)),
        }
        Ok(())
    }

    fn reference(&self, name: &str) -> Vec<LinkRef<'_>> {
        match name {
            "singleContainmentReference" => self.single_containment.iter().map(Link::as_link_ref).collect(),
            "multipleContainmentReference" => self.multiple_containment.iter().map(Link::as_link_ref).collect(),
            "singleNonContainmentReference" => self.single_reference.iter().map(Link::as_link_ref).collect(),
            "multipleNonContainmentReference" => self.multiple_references.iter().map(Link::as_link_ref).collect(),
            _ => Vec::new(),
        }
    }

    fn set_reference(&mut self, name: &str, mut links: Vec<Link>) -> Result<(), ModelError> {
        let single = |links: &mut Vec<Link>| match links.len() {
            0 | 1 => Ok(links.pop()),
            count => Err(ModelError::cardinality("PrimaryObject", name, count)),
        };
        match name {
            "singleContainmentReference" => self.single_containment = single(&mut links)?,
            "multipleContainmentReference" => self.multiple_containment = links,
            "singleNonContainmentReference" => self.single_reference = single(&mut links)?,
            "multipleNonContainmentReference" => self.multiple_references = links,
            _ => return Err(ModelError::unknown_reference("PrimaryObject", name)),
        }
        Ok(())
    }
}

/// An object with one attribute of every supported type.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ETypes {
    pub e_big_decimal: Option<String>,
    pub e_big_integer: Option<String>,
    pub e_boolean: bool,
    pub e_byte: i8,
    pub e_byte_array: Option<Vec<u8>>,
    pub e_char: char,
    pub e_date: Option<DateTime<Utc>>,
    pub e_double: f64,
    pub e_float: f32,
    pub e_int: i32,
    pub e_long: i64,
    pub e_short: i16,
    pub e_string: Option<String>,
    pub e_boxed_int: Option<i32>,
    pub e_color: Option<String>,
    pub e_point: Option<(i32, i32)>,
    pub e_samples: Vec<f64>,
}

const COLORS: [&str; 3] = ["Red", "Green", "Blue"];

impl Model for ETypes {
    fn class(&self) -> Class {
        Class::new("ETypes")
            .attribute(AttributeDef::new("eBigDecimal", DataType::Decimal))
            .attribute(AttributeDef::new("eBigInteger", DataType::BigInt))
            .attribute(AttributeDef::new("eBoolean", DataType::Bool))
            .attribute(AttributeDef::new("eByte", DataType::Int(IntType::I8)))
            .attribute(AttributeDef::new("eByteArray", DataType::ByteString))
            .attribute(AttributeDef::new("eChar", DataType::Char))
            .attribute(AttributeDef::new("eDate", DataType::Date))
            .attribute(AttributeDef::new("eDouble", DataType::Float(FloatType::F64)))
            .attribute(AttributeDef::new("eFloat", DataType::Float(FloatType::F32)))
            .attribute(AttributeDef::new("eInt", DataType::Int(IntType::I32)))
            .attribute(AttributeDef::new("eLong", DataType::Int(IntType::I64)))
            .attribute(AttributeDef::new("eShort", DataType::Int(IntType::I16)))
            .attribute(AttributeDef::new("eString", DataType::Unicode))
            .attribute(AttributeDef::new(
                "eBoxedInt",
                DataType::optional(DataType::Int(IntType::I32)),
            ))
            .attribute(AttributeDef::new("eColor", DataType::enumeration(COLORS)))
            .attribute(AttributeDef::new(
                "ePoint",
                DataType::record([
                    ("x", DataType::Int(IntType::I32)),
                    ("y", DataType::Int(IntType::I32)),
                ]),
            ))
            .attribute(AttributeDef::new("eSamples", DataType::Float(FloatType::F64)).many())
    }

    fn attribute(&self, name: &str) -> Option<Datum> {
        Some(match name {
            "eBigDecimal" => Datum::Decimal(self.e_big_decimal.clone()?),
            "eBigInteger" => Datum::BigInt(self.e_big_integer.clone()?),
            "eBoolean" => Datum::Bool(self.e_boolean),
            "eByte" => Datum::I8(self.e_byte),
            "eByteArray" => Datum::Bytes(self.e_byte_array.clone()?),
            "eChar" => Datum::Char(self.e_char),
            "eDate" => Datum::Date(self.e_date?),
            "eDouble" => Datum::F64(self.e_double),
            "eFloat" => Datum::F32(self.e_float),
            "eInt" => Datum::I32(self.e_int),
            "eLong" => Datum::I64(self.e_long),
            "eShort" => Datum::I16(self.e_short),
            "eString" => Datum::Unicode(self.e_string.clone()?),
            "eBoxedInt" => Datum::from(self.e_boxed_int),
            "eColor" => Datum::Enum(self.e_color.clone()?),
            "ePoint" => {
                let (x, y) = self.e_point?;
                let mut fields = IndexMap::new();
                fields.insert("x".to_string(), Datum::I32(x));
                fields.insert("y".to_string(), Datum::I32(y));
                Datum::Record(fields)
            }
            "eSamples" => Datum::Sequence(self.e_samples.iter().copied().map(Datum::F64).collect()),
            _ => return None,
        })
    }

    fn set_attribute(&mut self, name: &str, value: Datum) -> Result<(), ModelError> {
        let mismatch = |v| ModelError::mismatch("ETypes", name, v);
        match (name, value) {
            ("eBigDecimal", Datum::Decimal(v)) => self.e_big_decimal = Some(v),
            ("eBigInteger", Datum::BigInt(v)) => self.e_big_integer = Some(v),
            ("eBoolean", Datum::Bool(v)) => self.e_boolean = v,
            ("eByte", Datum::I8(v)) => self.e_byte = v,
            ("eByteArray", Datum::Bytes(v)) => self.e_byte_array = Some(v),
            ("eChar", Datum::Char(v)) => self.e_char = v,
            ("eDate", Datum::Date(v)) => self.e_date = Some(v),
            ("eDouble", Datum::F64(v)) => self.e_double = v,
            ("eFloat", Datum::F32(v)) => self.e_float = v,
            ("eInt", Datum::I32(v)) => self.e_int = v,
            ("eLong", Datum::I64(v)) => self.e_long = v,
            ("eShort", Datum::I16(v)) => self.e_short = v,
            ("eString", Datum::Unicode(v)) => self.e_string = Some(v),
            ("eBoxedInt", v) => self.e_boxed_int = v.into_option().map_err(mismatch)?,
            ("eColor", Datum::Enum(v)) => self.e_color = Some(v),
            ("ePoint", Datum::Record(fields)) => {
                let coordinate = |key: &str| match fields.get(key) {
                    Some(Datum::I32(v)) => Some(*v),
                    _ => None,
                };
                self.e_point = coordinate("x").zip(coordinate("y"));
            }
            ("eSamples", v) => self.e_samples = v.into_vec().map_err(mismatch)?,
            (
                "eBigDecimal" | "eBigInteger" | "eBoolean" | "eByte" | "eByteArray" | "eChar"
                | "eDate" | "eDouble" | "eFloat" | "eInt" | "eLong" | "eShort" | "eString"
                | "eColor" | "ePoint",
                v,
            ) => return Err(mismatch(v)),
            _ => return Err(ModelError::unknown_attribute("ETypes", name)),
        }
        Ok(())
    }
}

impl ETypes {
    /// A value with every attribute set to something other than its default.
    pub fn sample() -> Self {
        ETypes {
            e_big_decimal: Some("1.000000000000000000001".into()),
            e_big_integer: Some("123456789012345678901234567890".into()),
            e_boolean: true,
            e_byte: 3,
            e_byte_array: Some(vec![1, 2, 0, 255]),
            e_char: 'j',
            e_date: DateTime::from_timestamp_millis(1_318_000_000_123),
            e_double: 0.1,
            e_float: 1.5e-3,
            e_int: -7,
            e_long: i64::MIN,
            e_short: 1,
            e_string: Some("j".into()),
            e_boxed_int: Some(42),
            e_color: Some("Green".into()),
            e_point: Some((3, -4)),
            e_samples: vec![1.0, -0.0, f64::INFINITY],
        }
    }
}

pub fn registry() -> Arc<Registry> {
    Arc::new(
        Registry::builder()
            .register_default::<TargetObject>()
            .register_default::<PrimaryObject>()
            .register_default::<ETypes>()
            .build(),
    )
}

pub fn handler(store: &MemoryStore) -> Handler<&MemoryStore> {
    Handler::new(store, registry())
}

pub fn collection(name: &str) -> Address {
    Address::parse(&format!("resin://localhost/junit/{name}/")).unwrap()
}

pub fn object_address(name: &str, id: &str) -> Address {
    Address::parse(&format!("resin://localhost/junit/{name}/{id}")).unwrap()
}
