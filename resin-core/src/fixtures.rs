//! Models shared by the unit tests.

use crate::classify::{DataType, FloatType, IntType};
use crate::datum::Datum;
use crate::model::{AttributeDef, Class, Link, LinkRef, Model, ModelError, ReferenceDef, Registry};

#[derive(Debug, Default)]
pub struct Note {
    pub title: Option<String>,
    pub code: Option<String>,
    pub count: i32,
    pub score: f64,
    pub tags: Vec<String>,
    pub children: Vec<Link>,
    pub see_also: Vec<Link>,
}

impl Note {
    pub fn titled(title: &str) -> Self {
        Note {
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    pub fn with_child(mut self, child: Note) -> Self {
        self.children.push(Link::object(child));
        self
    }
}

impl Model for Note {
    fn class(&self) -> Class {
        Class::new("Note")
            .attribute(AttributeDef::new("title", DataType::Unicode))
            .attribute(AttributeDef::new("code", DataType::Unicode).id())
            .attribute(AttributeDef::new("count", DataType::Int(IntType::I32)))
            .attribute(AttributeDef::new("score", DataType::Float(FloatType::F64)))
            .attribute(AttributeDef::new("tags", DataType::Unicode).many())
            .reference(ReferenceDef::containment("children", "Note").many())
            .reference(ReferenceDef::cross("see_also", "Note").many())
    }

    fn attribute(&self, name: &str) -> Option<Datum> {
        match name {
            "title" => self.title.clone().map(Datum::from),
            "code" => self.code.clone().map(Datum::from),
            "count" => Some(Datum::I32(self.count)),
            "score" => Some(Datum::F64(self.score)),
            "tags" => Some(Datum::Sequence(
                self.tags.iter().map(|t| Datum::from(t.as_str())).collect(),
            )),
            _ => None,
        }
    }

    fn set_attribute(&mut self, name: &str, value: Datum) -> Result<(), ModelError> {
        let mismatch = |v| ModelError::mismatch("Note", name, v);
        match name {
            "title" => self.title = value.into_option().map_err(mismatch)?,
            "code" => self.code = value.into_option().map_err(mismatch)?,
            "count" => self.count = value.try_into().map_err(mismatch)?,
            "score" => self.score = value.try_into().map_err(mismatch)?,
            "tags" => self.tags = value.into_vec().map_err(mismatch)?,
            _ => return Err(ModelError::unknown_attribute("Note", name)),
        }
        Ok(())
    }

    fn reference(&self, name: &str) -> Vec<LinkRef<'_>> {
        match name {
            "children" => self.children.iter().map(Link::as_link_ref).collect(),
            "see_also" => self.see_also.iter().map(Link::as_link_ref).collect(),
            _ => Vec::new(),
        }
    }

    fn set_reference(&mut self, name: &str, links: Vec<Link>) -> Result<(), ModelError> {
        match name {
            "children" => self.children = links,
            "see_also" => self.see_also = links,
            _ => return Err(ModelError::unknown_reference("Note", name)),
        }
        Ok(())
    }
}

pub fn registry() -> Registry {
    Registry::builder().register_default::<Note>().build()
}
