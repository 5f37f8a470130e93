use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

use fieldpath::{path, Element, FieldpathExt, Path};
use serde_json::Value;

use crate::{
    gvk::{GroupVersion, GroupVersionKind},
    Error, Result,
};

/// A single manifest document of any kind.
///
/// Only the identity fields are typed, everything else stays an open json object.
/// Cloning is a deep copy, lists never share a resource between each other.
#[derive(Clone, Debug, PartialEq)]
pub struct Resource {
    object: Value,
}

fn str_at<'a>(object: &'a Value, path: &Path) -> &'a str {
    object
        .get_path(path)
        .ok()
        .and_then(Value::as_str)
        .unwrap_or_default()
}

fn metadata_entry(map: &'static str, key: &str) -> Vec<Element> {
    vec![
        Element::StaticField("metadata"),
        Element::StaticField(map),
        Element::Field(key.to_owned()),
    ]
}

fn string_map_at(object: &Value, path: &Path) -> BTreeMap<String, String> {
    match object.get_path(path) {
        Ok(Value::Object(map)) => map
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_owned())))
            .collect(),
        _ => BTreeMap::new(),
    }
}

impl Resource {
    /// Turns a decoded document into a resource.
    ///
    /// Null and `{}` documents are not resources and yield `None`.
    pub fn from_document(document: Value) -> Result<Option<Self>> {
        match &document {
            Value::Null => Ok(None),
            Value::Object(map) if map.is_empty() => Ok(None),
            Value::Object(_) => Self::try_from(document).map(Some),
            other => Err(Error::InvalidResource(format!(
                "expected an object, got {}",
                other
            ))),
        }
    }

    /// Wraps an object returned by the API server, identity fields are not checked
    pub(crate) fn from_server(object: Value) -> Self {
        Self { object }
    }

    pub fn api_version(&self) -> &str {
        str_at(&self.object, path!(."apiVersion"))
    }

    pub fn kind(&self) -> &str {
        str_at(&self.object, path!(."kind"))
    }

    pub fn group_version_kind(&self) -> GroupVersionKind {
        let GroupVersion { group, version } = GroupVersion::parse_api_version(self.api_version());
        GroupVersionKind::new(group, version, self.kind())
    }

    /// Empty for cluster-scoped resources, or when the manifest does not set one
    pub fn namespace(&self) -> &str {
        str_at(&self.object, path!(."metadata"."namespace"))
    }

    pub fn name(&self) -> &str {
        str_at(&self.object, path!(."metadata"."name"))
    }

    pub fn resource_version(&self) -> &str {
        str_at(&self.object, path!(."metadata"."resourceVersion"))
    }

    pub fn labels(&self) -> BTreeMap<String, String> {
        string_map_at(&self.object, path!(."metadata"."labels"))
    }

    pub fn annotations(&self) -> BTreeMap<String, String> {
        string_map_at(&self.object, path!(."metadata"."annotations"))
    }

    pub fn set_namespace(&mut self, namespace: &str) -> Result<()> {
        self.insert_path(path!(."metadata"."namespace"), Value::from(namespace))
    }

    pub fn set_name(&mut self, name: &str) -> Result<()> {
        self.insert_path(path!(."metadata"."name"), Value::from(name))
    }

    pub fn set_label(&mut self, key: &str, value: &str) -> Result<()> {
        self.insert_path(&metadata_entry("labels", key), Value::from(value))
    }

    pub fn set_annotation(&mut self, key: &str, value: &str) -> Result<()> {
        self.insert_path(&metadata_entry("annotations", key), Value::from(value))
    }

    pub fn get_path(&self, path: &Path) -> Option<&Value> {
        self.object.get_path(path).ok()
    }

    /// Sets a value, creating missing objects on the way
    pub fn insert_path(&mut self, path: &Path, value: Value) -> Result<()> {
        self.object.insert_path(path, value)?;
        Ok(())
    }

    pub fn as_value(&self) -> &Value {
        &self.object
    }

    pub fn into_value(self) -> Value {
        self.object
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&self.object)
    }
}

impl TryFrom<Value> for Resource {
    type Error = Error;

    fn try_from(object: Value) -> Result<Self> {
        if !object.is_object() {
            return Err(Error::InvalidResource("expected an object".to_owned()));
        }
        let resource = Self { object };
        if resource.api_version().is_empty() {
            return Err(Error::InvalidResource("apiVersion is missing".to_owned()));
        }
        if resource.kind().is_empty() {
            return Err(Error::InvalidResource("kind is missing".to_owned()));
        }
        Ok(resource)
    }
}

impl Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.api_version(), self.kind(), self.name())?;
        if !self.namespace().is_empty() {
            write!(f, " in {}", self.namespace())?;
        }
        Ok(())
    }
}
