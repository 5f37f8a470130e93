//! Mutations for [`crate::List::transform`].
//!
//! A transformer receives its own copy of every resource, so it may freely
//! mutate it. Any error aborts the whole transform.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::{Error, Resource, Result};

pub type Transformer = Box<dyn Fn(&mut Resource) -> anyhow::Result<()> + Send + Sync>;

pub fn set_namespace(namespace: impl Into<String>) -> Transformer {
    let namespace = namespace.into();
    Box::new(move |r: &mut Resource| -> anyhow::Result<()> {
        r.set_namespace(&namespace)?;
        Ok(())
    })
}

/// Adds labels, existing labels with other keys are kept
pub fn set_labels<K, V>(labels: impl IntoIterator<Item = (K, V)>) -> Transformer
where
    K: Into<String>,
    V: Into<String>,
{
    let labels: BTreeMap<String, String> = labels
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();
    Box::new(move |r: &mut Resource| -> anyhow::Result<()> {
        for (k, v) in &labels {
            r.set_label(k, v)?;
        }
        Ok(())
    })
}

pub fn set_annotations<K, V>(annotations: impl IntoIterator<Item = (K, V)>) -> Transformer
where
    K: Into<String>,
    V: Into<String>,
{
    let annotations: BTreeMap<String, String> = annotations
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();
    Box::new(move |r: &mut Resource| -> anyhow::Result<()> {
        for (k, v) in &annotations {
            r.set_annotation(k, v)?;
        }
        Ok(())
    })
}

/// Sets the value at a field path such as `.spec.template.metadata.labels."app"`
///
/// Missing objects on the way are created.
pub fn set_path(path: &str, value: Value) -> Result<Transformer> {
    let parsed = fieldpath::parse(path).map_err(|e| Error::InvalidPath {
        path: path.to_owned(),
        message: e.to_string(),
    })?;
    Ok(Box::new(move |r: &mut Resource| -> anyhow::Result<()> {
        r.insert_path(&parsed, value.clone())?;
        Ok(())
    }))
}
