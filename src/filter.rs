//! Predicates for [`crate::List::filter`].

use std::collections::BTreeMap;

use crate::{gvk::GroupVersionKind, Resource};

pub type Filter = Box<dyn Fn(&Resource) -> bool + Send + Sync>;

pub fn by_kind(kind: impl Into<String>) -> Filter {
    let kind = kind.into();
    Box::new(move |r: &Resource| r.kind() == kind)
}

pub fn by_group_version_kind(gvk: GroupVersionKind) -> Filter {
    Box::new(move |r: &Resource| r.group_version_kind() == gvk)
}

pub fn by_name(name: impl Into<String>) -> Filter {
    let name = name.into();
    Box::new(move |r: &Resource| r.name() == name)
}

pub fn by_namespace(namespace: impl Into<String>) -> Filter {
    let namespace = namespace.into();
    Box::new(move |r: &Resource| r.namespace() == namespace)
}

/// Matches resources carrying at least one of the given label pairs
pub fn by_labels<K, V>(labels: impl IntoIterator<Item = (K, V)>) -> Filter
where
    K: Into<String>,
    V: Into<String>,
{
    let labels: BTreeMap<String, String> = labels
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();
    Box::new(move |r: &Resource| {
        let present = r.labels();
        labels
            .iter()
            .any(|(k, v)| present.get(k).map(|found| found == v).unwrap_or(false))
    })
}

pub fn all(filters: Vec<Filter>) -> Filter {
    Box::new(move |r: &Resource| filters.iter().all(|f| f(r)))
}

pub fn any(filters: Vec<Filter>) -> Filter {
    Box::new(move |r: &Resource| filters.iter().any(|f| f(r)))
}

pub fn not(filter: Filter) -> Filter {
    Box::new(move |r: &Resource| !filter(r))
}
