//! Resolution between kinds and REST resources.
//!
//! [`StaticRestMapper`] answers from a fixed discovery snapshot,
//! [`DynamicRestMapper`] wraps one and lazily extends it from the API server
//! whenever a lookup misses.

mod dynamic;
mod snapshot;

use std::fmt::{self, Display};

use async_trait::async_trait;
use thiserror::Error;

use crate::gvk::{GroupKind, GroupVersion, GroupVersionKind, GroupVersionResource};

pub use dynamic::DynamicRestMapper;
pub use snapshot::{ApiGroupResources, StaticRestMapper};

#[cfg(test)]
pub(crate) use snapshot::tests as snapshot_tests;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    Namespaced,
    Cluster,
}

/// Where objects of a kind are served
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RestMapping {
    /// Plural resource
    pub resource: GroupVersionResource,
    pub group_version_kind: GroupVersionKind,
    pub scope: Scope,
}

/// Failed group-versions of one discovery round, sorted by group-version
#[derive(Debug)]
pub struct DiscoveryFailures(Vec<(GroupVersion, kube::Error)>);

impl DiscoveryFailures {
    pub fn new(mut failures: Vec<(GroupVersion, kube::Error)>) -> Self {
        failures.sort_by(|a, b| a.0.cmp(&b.0));
        Self(failures)
    }

    pub fn failures(&self) -> &[(GroupVersion, kube::Error)] {
        &self.0
    }
}

impl Display for DiscoveryFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (group_version, error)) in self.0.iter().enumerate() {
            if idx != 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", group_version, error)?;
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum MappingError {
    #[error("no matches for kind \"{group_kind}\" in versions {searched_versions:?}")]
    NoKindMatch {
        group_kind: GroupKind,
        searched_versions: Vec<String>,
    },
    #[error("no matches for {resource}")]
    NoResourceMatch { resource: GroupVersionResource },
    #[error("{resource} matches multiple resources or kinds: {}", .matches.join(", "))]
    AmbiguousResource {
        resource: GroupVersionResource,
        matches: Vec<String>,
    },
    #[error("unable to find API group {0:?}: server returned an empty group list")]
    GroupListEmpty(String),
    #[error("unable to list API groups: {0}")]
    ServerGroups(#[source] kube::Error),
    #[error("unable to retrieve the complete list of server APIs: {0}")]
    Discovery(DiscoveryFailures),
}

impl MappingError {
    /// Misses that may be resolved by refreshing discovery
    pub fn is_no_match(&self) -> bool {
        matches!(
            self,
            MappingError::NoKindMatch { .. } | MappingError::NoResourceMatch { .. }
        )
    }
}

pub type Result<T, E = MappingError> = std::result::Result<T, E>;

#[async_trait]
pub trait RestMapper: Send + Sync {
    /// Kind served by a resource; ambiguous partial inputs are errors
    async fn kind_for(&self, resource: &GroupVersionResource) -> Result<GroupVersionKind>;
    async fn kinds_for(&self, resource: &GroupVersionResource) -> Result<Vec<GroupVersionKind>>;

    /// Fully qualified plural resource for a possibly partial input
    async fn resource_for(
        &self,
        resource: &GroupVersionResource,
    ) -> Result<GroupVersionResource>;
    async fn resources_for(
        &self,
        resource: &GroupVersionResource,
    ) -> Result<Vec<GroupVersionResource>>;

    /// First mapping for a kind, trying `versions` in order; empty versions mean any
    async fn rest_mapping(&self, group_kind: &GroupKind, versions: &[&str]) -> Result<RestMapping>;
    async fn rest_mappings(
        &self,
        group_kind: &GroupKind,
        versions: &[&str],
    ) -> Result<Vec<RestMapping>>;

    async fn resource_singularizer(&self, resource: &str) -> Result<String>;
}
