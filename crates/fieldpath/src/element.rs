use serde_json::Value;
use std::fmt::{self, Display};

#[derive(Debug, PartialEq, Clone)]
pub enum Element {
    Field(String),
    StaticField(&'static str),
    /// Array item whose `.0` field equals `.1`
    Select(String, Value),
    Index(usize),
}

impl Element {
    pub fn field_name(&self) -> Option<&str> {
        match self {
            Self::Field(name) => Some(name),
            Self::StaticField(name) => Some(name),
            _ => None,
        }
    }
}

fn write_field(f: &mut fmt::Formatter<'_>, n: &str) -> fmt::Result {
    if n.contains(['"', '.', '[', '\n']) {
        write!(f, ".\"{}\"", n.replace('"', "\\\""))
    } else {
        write!(f, ".{}", n)
    }
}

impl Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaticField(field) => write_field(f, field),
            Self::Field(field) => write_field(f, field),
            Self::Select(key, value) => write!(f, "[{}={}]", key, value),
            Self::Index(idx) => write!(f, "[{}]", idx),
        }
    }
}
