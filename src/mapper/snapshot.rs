use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{APIGroup, APIResource};

use super::{MappingError, Result, RestMapper, RestMapping, Scope};
use crate::gvk::{GroupKind, GroupVersionKind, GroupVersionResource};

/// Discovered group with resource lists of every fetched version
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ApiGroupResources {
    pub group: APIGroup,
    pub versioned_resources: BTreeMap<String, Vec<APIResource>>,
}

#[derive(Clone, Debug)]
struct Entry {
    mapping: RestMapping,
    singular: String,
}

impl Entry {
    fn matches(&self, input: &GroupVersionResource, name: &str) -> bool {
        let resource = &self.mapping.resource;
        (input.group.is_empty() || input.group == resource.group)
            && (input.version.is_empty() || input.version == resource.version)
            && (resource.resource == name || self.singular == name)
    }
}

/// Immutable mapping tables built from a set of discovered groups
///
/// Entries are ordered by group (core group first, then by name), then by
/// version (preferred version first, then discovery order), then by resource
/// discovery order; every lookup returns results in that order.
#[derive(Clone, Debug, Default)]
pub struct StaticRestMapper {
    entries: Vec<Entry>,
}

fn ordered_versions(group: &ApiGroupResources) -> Vec<&str> {
    let mut versions: Vec<&str> = group
        .group
        .versions
        .iter()
        .map(|v| v.version.as_str())
        .collect();
    if let Some(preferred) = &group.group.preferred_version {
        if let Some(pos) = versions.iter().position(|v| *v == preferred.version) {
            let preferred = versions.remove(pos);
            versions.insert(0, preferred);
        }
    }
    versions
}

impl StaticRestMapper {
    pub fn new<'a>(groups: impl IntoIterator<Item = &'a ApiGroupResources>) -> Self {
        let mut groups: Vec<_> = groups.into_iter().collect();
        groups.sort_by(|a, b| a.group.name.cmp(&b.group.name));

        let mut entries = Vec::new();
        for group in groups {
            let name = &group.group.name;
            for version in ordered_versions(group) {
                let Some(resources) = group.versioned_resources.get(version) else {
                    continue;
                };
                for resource in resources {
                    if resource.name.contains('/') {
                        continue;
                    }
                    let singular = if resource.singular_name.is_empty() {
                        resource.kind.to_lowercase()
                    } else {
                        resource.singular_name.clone()
                    };
                    entries.push(Entry {
                        mapping: RestMapping {
                            resource: GroupVersionResource::new(name, version, &resource.name),
                            group_version_kind: GroupVersionKind::new(
                                name,
                                version,
                                &resource.kind,
                            ),
                            scope: if resource.namespaced {
                                Scope::Namespaced
                            } else {
                                Scope::Cluster
                            },
                        },
                        singular,
                    });
                }
            }
        }
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn matching<'a>(
        &'a self,
        input: &'a GroupVersionResource,
    ) -> Result<impl Iterator<Item = &'a Entry> + 'a> {
        let name = input.resource.to_lowercase();
        if !self.entries.iter().any(|e| e.matches(input, &name)) {
            return Err(MappingError::NoResourceMatch {
                resource: input.clone(),
            });
        }
        Ok(self.entries.iter().filter(move |e| e.matches(input, &name)))
    }

    pub fn kinds_for(&self, input: &GroupVersionResource) -> Result<Vec<GroupVersionKind>> {
        let mut out: Vec<GroupVersionKind> = Vec::new();
        for entry in self.matching(input)? {
            if !out.contains(&entry.mapping.group_version_kind) {
                out.push(entry.mapping.group_version_kind.clone());
            }
        }
        Ok(out)
    }

    pub fn kind_for(&self, input: &GroupVersionResource) -> Result<GroupVersionKind> {
        let kinds = self.kinds_for(input)?;
        let mut distinct: Vec<GroupKind> = kinds.iter().map(|k| k.group_kind()).collect();
        distinct.sort_unstable();
        distinct.dedup();
        // Groups carry no priority here, so matches across groups are not ranked.
        // Versions of one group are ordered, the first (preferred) one wins.
        if distinct.len() > 1 {
            return Err(MappingError::AmbiguousResource {
                resource: input.clone(),
                matches: kinds.iter().map(ToString::to_string).collect(),
            });
        }
        Ok(kinds.into_iter().next().unwrap_or_default())
    }

    pub fn resources_for(
        &self,
        input: &GroupVersionResource,
    ) -> Result<Vec<GroupVersionResource>> {
        let mut out: Vec<GroupVersionResource> = Vec::new();
        for entry in self.matching(input)? {
            if !out.contains(&entry.mapping.resource) {
                out.push(entry.mapping.resource.clone());
            }
        }
        Ok(out)
    }

    pub fn resource_for(&self, input: &GroupVersionResource) -> Result<GroupVersionResource> {
        let resources = self.resources_for(input)?;
        let mut distinct: Vec<(&str, &str)> = resources
            .iter()
            .map(|r| (r.group.as_str(), r.resource.as_str()))
            .collect();
        distinct.sort_unstable();
        distinct.dedup();
        // Same rule as kind_for: one group resolves, several are ambiguous
        if distinct.len() > 1 {
            return Err(MappingError::AmbiguousResource {
                resource: input.clone(),
                matches: resources.iter().map(ToString::to_string).collect(),
            });
        }
        Ok(resources.into_iter().next().unwrap_or_default())
    }

    fn entries_of<'a>(&'a self, group_kind: &'a GroupKind) -> impl Iterator<Item = &'a Entry> + 'a {
        self.entries.iter().filter(move |e| {
            let gvk = &e.mapping.group_version_kind;
            gvk.group == group_kind.group && gvk.kind == group_kind.kind
        })
    }

    fn no_kind_match(group_kind: &GroupKind, versions: &[&str]) -> MappingError {
        MappingError::NoKindMatch {
            group_kind: group_kind.clone(),
            searched_versions: versions.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn rest_mappings(&self, group_kind: &GroupKind, versions: &[&str]) -> Result<Vec<RestMapping>> {
        let versions: Vec<&str> = versions.iter().copied().filter(|v| !v.is_empty()).collect();
        let mut out = Vec::new();
        if versions.is_empty() {
            out.extend(self.entries_of(group_kind).map(|e| e.mapping.clone()));
        } else {
            for version in &versions {
                out.extend(
                    self.entries_of(group_kind)
                        .filter(|e| e.mapping.group_version_kind.version == *version)
                        .map(|e| e.mapping.clone()),
                );
            }
        }
        if out.is_empty() {
            return Err(Self::no_kind_match(group_kind, &versions));
        }
        Ok(out)
    }

    pub fn rest_mapping(&self, group_kind: &GroupKind, versions: &[&str]) -> Result<RestMapping> {
        let mut mappings = self.rest_mappings(group_kind, versions)?;
        Ok(mappings.swap_remove(0))
    }

    /// Singular name of a plural resource, singular names are returned as-is
    pub fn resource_singularizer(&self, resource: &str) -> Result<String> {
        let name = resource.to_lowercase();
        if let Some(entry) = self.entries.iter().find(|e| e.mapping.resource.resource == name) {
            return Ok(entry.singular.clone());
        }
        if self.entries.iter().any(|e| e.singular == name) {
            return Ok(name);
        }
        Err(MappingError::NoResourceMatch {
            resource: GroupVersionResource::new("", "", resource),
        })
    }
}

#[async_trait]
impl RestMapper for StaticRestMapper {
    async fn kind_for(&self, resource: &GroupVersionResource) -> Result<GroupVersionKind> {
        StaticRestMapper::kind_for(self, resource)
    }

    async fn kinds_for(&self, resource: &GroupVersionResource) -> Result<Vec<GroupVersionKind>> {
        StaticRestMapper::kinds_for(self, resource)
    }

    async fn resource_for(
        &self,
        resource: &GroupVersionResource,
    ) -> Result<GroupVersionResource> {
        StaticRestMapper::resource_for(self, resource)
    }

    async fn resources_for(
        &self,
        resource: &GroupVersionResource,
    ) -> Result<Vec<GroupVersionResource>> {
        StaticRestMapper::resources_for(self, resource)
    }

    async fn rest_mapping(&self, group_kind: &GroupKind, versions: &[&str]) -> Result<RestMapping> {
        StaticRestMapper::rest_mapping(self, group_kind, versions)
    }

    async fn rest_mappings(
        &self,
        group_kind: &GroupKind,
        versions: &[&str],
    ) -> Result<Vec<RestMapping>> {
        StaticRestMapper::rest_mappings(self, group_kind, versions)
    }

    async fn resource_singularizer(&self, resource: &str) -> Result<String> {
        StaticRestMapper::resource_singularizer(self, resource)
    }
}
