use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{APIGroup, APIResource, GroupVersionForDiscovery};
use rustc_hash::FxHashMap;
use tokio::sync::RwLock;

use super::{
    ApiGroupResources, DiscoveryFailures, MappingError, Result, RestMapper, RestMapping,
    StaticRestMapper,
};
use crate::{
    client::DiscoveryClient,
    gvk::{GroupKind, GroupVersion, GroupVersionKind, GroupVersionResource},
};

#[derive(Default)]
struct State {
    snapshot: Arc<StaticRestMapper>,
    known_groups: BTreeMap<String, ApiGroupResources>,
    /// Group directory, entries are never refreshed once known
    api_groups: FxHashMap<String, APIGroup>,
}

impl State {
    fn merge(&mut self, group_version: &GroupVersion, resources: Vec<APIResource>) {
        let known = self
            .known_groups
            .entry(group_version.group.clone())
            .or_insert_with(|| ApiGroupResources {
                group: APIGroup {
                    name: group_version.group.clone(),
                    ..Default::default()
                },
                versioned_resources: BTreeMap::new(),
            });
        if known.group.preferred_version.is_none() {
            known.group.preferred_version = self
                .api_groups
                .get(&group_version.group)
                .and_then(|g| g.preferred_version.clone());
        }
        if !known
            .group
            .versions
            .iter()
            .any(|v| v.version == group_version.version)
        {
            known.group.versions.push(GroupVersionForDiscovery {
                group_version: group_version.api_version(),
                version: group_version.version.clone(),
            });
        }
        known
            .versioned_resources
            .insert(group_version.version.clone(), resources);
    }

    fn rebuild(&mut self) {
        self.snapshot = Arc::new(StaticRestMapper::new(self.known_groups.values()));
    }
}

fn versions_of(group: &APIGroup) -> Vec<String> {
    group.versions.iter().map(|v| v.version.clone()).collect()
}

/// Rest mapper which starts empty and learns API groups on demand
///
/// Every lookup is answered from the current snapshot first. A miss reloads
/// the requested group (and versions) from discovery and retries once.
/// Known groups are only ever added or refreshed, never forgotten.
pub struct DynamicRestMapper {
    client: Arc<dyn DiscoveryClient>,
    state: RwLock<State>,
}

impl DynamicRestMapper {
    pub fn new(client: Arc<dyn DiscoveryClient>) -> Self {
        Self {
            client,
            state: RwLock::new(State::default()),
        }
    }

    /// Current immutable snapshot, queries on it never block other readers
    pub async fn snapshot(&self) -> Arc<StaticRestMapper> {
        self.state.read().await.snapshot.clone()
    }

    async fn group_versions(&self, group: &str) -> Result<Vec<String>> {
        {
            let state = self.state.read().await;
            if let Some(found) = state.api_groups.get(group) {
                return Ok(versions_of(found));
            }
        }

        log::trace!("Listing API groups to find {:?}", group);
        let list = self
            .client
            .server_groups()
            .await
            .map_err(MappingError::ServerGroups)?;
        if list.groups.is_empty() {
            return Err(MappingError::GroupListEmpty(group.to_owned()));
        }

        let mut state = self.state.write().await;
        for found in list.groups {
            state.api_groups.entry(found.name.clone()).or_insert(found);
        }
        Ok(state
            .api_groups
            .get(group)
            .map(versions_of)
            .unwrap_or_default())
    }

    /// Fetch resource lists of a group and rebuild the snapshot
    ///
    /// With no (or only empty) versions every version the server reports for the
    /// group is fetched. Lists which were fetched successfully are kept even when
    /// some other version fails, the failures are then reported together.
    pub async fn reload(&self, group: &str, versions: &[&str]) -> Result<()> {
        let mut versions: Vec<String> = versions
            .iter()
            .filter(|v| !v.is_empty())
            .map(|v| v.to_string())
            .collect();
        if versions.is_empty() {
            versions = self.group_versions(group).await?;
        }
        log::debug!("Reloading API group {:?} versions {:?}", group, versions);

        let mut state = self.state.write().await;
        let mut failures = Vec::new();
        for version in versions {
            let group_version = GroupVersion::new(group, version);
            match self
                .client
                .server_resources_for_group_version(&group_version)
                .await
            {
                Ok(list) => {
                    log::trace!(
                        "Fetched {} resources of {}",
                        list.resources.len(),
                        group_version
                    );
                    state.merge(&group_version, list.resources);
                }
                Err(e) => failures.push((group_version, e)),
            }
        }
        state.rebuild();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(MappingError::Discovery(DiscoveryFailures::new(failures)))
        }
    }

    async fn resolve<T, F>(&self, group: &str, versions: &[&str], query: F) -> Result<T>
    where
        T: Send,
        F: Fn(&StaticRestMapper) -> Result<T> + Send + Sync,
    {
        let first = query(&*self.snapshot().await);
        match first {
            Err(e) if e.is_no_match() => {
                log::trace!("{}, reloading", e);
                self.reload(group, versions).await?;
                query(&*self.snapshot().await)
            }
            other => other,
        }
    }
}

#[async_trait]
impl RestMapper for DynamicRestMapper {
    async fn kind_for(&self, resource: &GroupVersionResource) -> Result<GroupVersionKind> {
        self.resolve(&resource.group, &[resource.version.as_str()], |m| m.kind_for(resource))
            .await
    }

    async fn kinds_for(&self, resource: &GroupVersionResource) -> Result<Vec<GroupVersionKind>> {
        self.resolve(&resource.group, &[resource.version.as_str()], |m| m.kinds_for(resource))
            .await
    }

    async fn resource_for(
        &self,
        resource: &GroupVersionResource,
    ) -> Result<GroupVersionResource> {
        self.resolve(&resource.group, &[resource.version.as_str()], |m| {
            m.resource_for(resource)
        })
        .await
    }

    async fn resources_for(
        &self,
        resource: &GroupVersionResource,
    ) -> Result<Vec<GroupVersionResource>> {
        self.resolve(&resource.group, &[resource.version.as_str()], |m| {
            m.resources_for(resource)
        })
        .await
    }

    async fn rest_mapping(&self, group_kind: &GroupKind, versions: &[&str]) -> Result<RestMapping> {
        self.resolve(&group_kind.group, versions, |m| {
            m.rest_mapping(group_kind, versions)
        })
        .await
    }

    async fn rest_mappings(
        &self,
        group_kind: &GroupKind,
        versions: &[&str],
    ) -> Result<Vec<RestMapping>> {
        self.resolve(&group_kind.group, versions, |m| {
            m.rest_mappings(group_kind, versions)
        })
        .await
    }

    async fn resource_singularizer(&self, resource: &str) -> Result<String> {
        self.snapshot().await.resource_singularizer(resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mapper::snapshot_tests::api_resource,
        mock_tests::{widget_group, FakeCluster},
    };
    use futures::future::join_all;

    fn widget() -> GroupKind {
        GroupKind::new("example.com", "Widget")
    }

    #[tokio::test]
    async fn reload_on_miss() {
        let cluster = FakeCluster::new();
        cluster.add_group(widget_group(&["v1", "v2"]));
        let mapper = cluster.mapper();
        assert!(mapper.snapshot().await.is_empty());

        let mapping = mapper.rest_mapping(&widget(), &[]).await.unwrap();
        assert_eq!(
            mapping.resource,
            GroupVersionResource::new("example.com", "v1", "widgets")
        );
        assert_eq!(cluster.group_list_fetches(), 1);
        assert_eq!(cluster.resource_fetches(), 2);

        // answered from the snapshot
        mapper.rest_mapping(&widget(), &["v2"]).await.unwrap();
        mapper.rest_mapping(&widget(), &[""]).await.unwrap();
        assert_eq!(cluster.group_list_fetches(), 1);
        assert_eq!(cluster.resource_fetches(), 2);
    }

    #[tokio::test]
    async fn explicit_version_skips_group_list() {
        let cluster = FakeCluster::new();
        let mapper = cluster.mapper();
        let kind = mapper
            .kind_for(&GroupVersionResource::new("apps", "v1", "deployments"))
            .await
            .unwrap();
        assert_eq!(kind, GroupVersionKind::new("apps", "v1", "Deployment"));
        assert_eq!(cluster.group_list_fetches(), 0);
        assert_eq!(cluster.resource_fetches(), 1);
    }

    #[tokio::test]
    async fn mappings_are_never_forgotten() {
        let cluster = FakeCluster::new();
        cluster.add_group(widget_group(&["v1"]));
        let mapper = cluster.mapper();

        let widget_mapping = mapper.rest_mapping(&widget(), &["v1"]).await.unwrap();
        mapper
            .rest_mapping(&GroupKind::new("apps", "Deployment"), &["v1"])
            .await
            .unwrap();
        mapper
            .rest_mapping(&GroupKind::new("", "ConfigMap"), &["v1"])
            .await
            .unwrap();
        let fetches = cluster.resource_fetches();

        assert_eq!(
            mapper.rest_mapping(&widget(), &["v1"]).await.unwrap(),
            widget_mapping
        );
        assert_eq!(cluster.resource_fetches(), fetches);
    }

    #[tokio::test]
    async fn singularizer_never_reloads() {
        let cluster = FakeCluster::new();
        let mapper = cluster.mapper();
        assert!(mapper.resource_singularizer("configmaps").await.is_err());
        assert_eq!(cluster.resource_fetches(), 0);

        mapper
            .rest_mapping(&GroupKind::new("", "ConfigMap"), &["v1"])
            .await
            .unwrap();
        assert_eq!(
            mapper.resource_singularizer("configmaps").await.unwrap(),
            "configmap"
        );
    }

    #[tokio::test]
    async fn unknown_group() {
        let cluster = FakeCluster::new();
        let mapper = cluster.mapper();
        let err = mapper
            .rest_mapping(&GroupKind::new("nope.io", "Thing"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, MappingError::NoKindMatch { .. }));
        assert_eq!(cluster.resource_fetches(), 0);
    }

    #[tokio::test]
    async fn group_directory_is_not_refreshed() {
        let cluster = FakeCluster::new();
        cluster.add_group(widget_group(&["v1"]));
        let mapper = cluster.mapper();
        mapper.rest_mapping(&widget(), &[]).await.unwrap();
        assert_eq!(cluster.group_list_fetches(), 1);

        cluster.add_version(
            &GroupVersion::new("example.com", "v2"),
            vec![api_resource("gadgets", "Gadget", true)],
        );
        let gadget = GroupKind::new("example.com", "Gadget");

        // the cached directory still lists v1 only
        let err = mapper.rest_mapping(&gadget, &[]).await.unwrap_err();
        assert!(matches!(err, MappingError::NoKindMatch { .. }));
        assert_eq!(cluster.group_list_fetches(), 1);

        let mapping = mapper.rest_mapping(&gadget, &["v2"]).await.unwrap();
        assert_eq!(
            mapping.resource,
            GroupVersionResource::new("example.com", "v2", "gadgets")
        );
        assert_eq!(cluster.group_list_fetches(), 1);
    }

    #[tokio::test]
    async fn unknown_version() {
        let cluster = FakeCluster::new();
        let mapper = cluster.mapper();
        let err = mapper
            .rest_mapping(&GroupKind::new("apps", "Deployment"), &["v7"])
            .await
            .unwrap_err();
        match err {
            MappingError::Discovery(failures) => {
                assert_eq!(failures.failures().len(), 1);
                assert_eq!(failures.failures()[0].0, GroupVersion::new("apps", "v7"));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[tokio::test]
    async fn empty_group_list() {
        let cluster = FakeCluster::empty();
        let mapper = cluster.mapper();
        let err = mapper
            .rest_mapping(&GroupKind::new("apps", "Deployment"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, MappingError::GroupListEmpty(group) if group == "apps"));
    }

    #[tokio::test]
    async fn partial_discovery_failure_keeps_successes() {
        let cluster = FakeCluster::new();
        cluster.add_group(widget_group(&["v1", "v1beta1", "v2"]));
        cluster.fail_group_version(GroupVersion::new("example.com", "v2"));
        cluster.fail_group_version(GroupVersion::new("example.com", "v1beta1"));
        let mapper = cluster.mapper();

        let err = mapper.rest_mapping(&widget(), &[]).await.unwrap_err();
        let MappingError::Discovery(failures) = &err else {
            panic!("unexpected error {err}");
        };
        let failed: Vec<_> = failures.failures().iter().map(|(gv, _)| gv.to_string()).collect();
        assert_eq!(failed, vec!["example.com/v1beta1", "example.com/v2"]);
        assert!(err
            .to_string()
            .starts_with("unable to retrieve the complete list of server APIs: example.com/v1beta1: "));

        let fetches = cluster.resource_fetches();
        mapper.rest_mapping(&widget(), &["v1"]).await.unwrap();
        assert_eq!(cluster.resource_fetches(), fetches);
    }

    #[tokio::test]
    async fn concurrent_lookups() {
        let cluster = FakeCluster::new();
        cluster.add_group(widget_group(&["v1"]));
        let mapper = cluster.mapper();

        let kinds = [
            widget(),
            GroupKind::new("apps", "Deployment"),
            GroupKind::new("", "ConfigMap"),
            GroupKind::new("", "Namespace"),
        ];
        let lookups = (0..16).map(|i| mapper.rest_mapping(&kinds[i % kinds.len()], &[]));
        let results = join_all(lookups).await;
        for (i, result) in results.into_iter().enumerate() {
            let mapping = result.unwrap();
            assert_eq!(mapping.group_version_kind.kind, kinds[i % kinds.len()].kind);
        }

        let snapshot = mapper.snapshot().await;
        for kind in &kinds {
            assert!(snapshot.rest_mapping(kind, &[]).is_ok());
        }
    }
}
