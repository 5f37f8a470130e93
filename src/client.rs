//! Cluster collaborators used by the mapper and the reconciler.
//!
//! Both are traits so that everything above them can run against any
//! control plane, [`KubeClient`] is the implementation over [`kube::Client`].

use async_trait::async_trait;
use http::Request;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{
    APIGroup, APIGroupList, APIResourceList, GroupVersionForDiscovery,
};
use kube::Client;
use serde_json::Value;

use crate::{
    gvk::{GroupVersion, GroupVersionResource},
    mapper::{RestMapping, Scope},
};

/// Represents object location on the API server
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectAddress {
    pub resource: GroupVersionResource,
    /// `None` for the top-level collection of a cluster-scoped type
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectAddress {
    /// Namespaced mappings are addressed inside the given namespace, cluster-scoped ones ignore it
    pub fn new(mapping: &RestMapping, namespace: &str, name: &str) -> Self {
        let namespace = match mapping.scope {
            Scope::Namespaced => Some(namespace.to_owned()),
            Scope::Cluster => None,
        };
        Self {
            resource: mapping.resource.clone(),
            namespace,
            name: name.to_owned(),
        }
    }

    pub fn url_path(&self) -> String {
        let ns_prefix = self
            .namespace
            .as_deref()
            .filter(|ns| !ns.is_empty())
            .map(|ns| format!("namespaces/{}/", ns))
            .unwrap_or_default();

        format!(
            "/{prefix}/{group_version}/{ns_prefix}{plural}/{name}",
            prefix = if self.resource.group.is_empty() {
                "api"
            } else {
                "apis"
            },
            group_version = self.resource.group_version(),
            ns_prefix = ns_prefix,
            plural = self.resource.resource,
            name = self.name,
        )
    }
}

/// Server-side apply request parameters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApplyParams {
    pub field_manager: String,
    pub force: bool,
}

#[async_trait]
pub trait DiscoveryClient: Send + Sync {
    /// All API groups served, the core group included under the empty name
    async fn server_groups(&self) -> Result<APIGroupList, kube::Error>;

    async fn server_resources_for_group_version(
        &self,
        group_version: &GroupVersion,
    ) -> Result<APIResourceList, kube::Error>;
}

/// Untyped object access, not-found is reported as an api error with code 404
#[async_trait]
pub trait DynamicClient: Send + Sync {
    async fn get(&self, address: &ObjectAddress) -> Result<Value, kube::Error>;

    async fn apply(
        &self,
        address: &ObjectAddress,
        patch: Vec<u8>,
        params: &ApplyParams,
    ) -> Result<Value, kube::Error>;

    async fn delete(&self, address: &ObjectAddress) -> Result<(), kube::Error>;
}

pub(crate) fn is_not_found(error: &kube::Error) -> bool {
    matches!(error, kube::Error::Api(apierror) if apierror.code == 404)
}

#[derive(Clone)]
pub struct KubeClient {
    client: Client,
}

impl KubeClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl From<Client> for KubeClient {
    fn from(client: Client) -> Self {
        Self::new(client)
    }
}

#[async_trait]
impl DiscoveryClient for KubeClient {
    async fn server_groups(&self) -> Result<APIGroupList, kube::Error> {
        let core_versions = self.client.list_core_api_versions().await?.versions;
        let mut list = self.client.list_api_groups().await?;

        if !core_versions.is_empty() {
            let versions: Vec<_> = core_versions
                .into_iter()
                .map(|version| GroupVersionForDiscovery {
                    group_version: version.clone(),
                    version,
                })
                .collect();
            list.groups.insert(
                0,
                APIGroup {
                    name: String::new(),
                    preferred_version: versions.first().cloned(),
                    versions,
                    ..Default::default()
                },
            );
        }
        Ok(list)
    }

    async fn server_resources_for_group_version(
        &self,
        group_version: &GroupVersion,
    ) -> Result<APIResourceList, kube::Error> {
        log::trace!("Listing resources of {}", group_version);
        if group_version.group.is_empty() {
            self.client
                .list_core_api_resources(&group_version.version)
                .await
        } else {
            self.client
                .list_api_group_resources(&group_version.api_version())
                .await
        }
    }
}

/// Apply patch target, kept out of async fns since the query serializer is not `Send`
fn apply_url(address: &ObjectAddress, params: &ApplyParams) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("fieldManager", &params.field_manager);
    if params.force {
        query.append_pair("force", "true");
    }
    format!("{}?{}", address.url_path(), query.finish())
}

#[async_trait]
impl DynamicClient for KubeClient {
    async fn get(&self, address: &ObjectAddress) -> Result<Value, kube::Error> {
        let req = Request::get(address.url_path())
            .header("Accept", "application/json")
            .body(vec![])
            .map_err(kube::Error::HttpError)?;
        self.client.request(req).await
    }

    async fn apply(
        &self,
        address: &ObjectAddress,
        patch: Vec<u8>,
        params: &ApplyParams,
    ) -> Result<Value, kube::Error> {
        let req = Request::patch(apply_url(address, params))
            .header("Accept", "application/json")
            .header("Content-Type", "application/apply-patch+yaml")
            .body(patch)
            .map_err(kube::Error::HttpError)?;
        self.client.request(req).await
    }

    async fn delete(&self, address: &ObjectAddress) -> Result<(), kube::Error> {
        let req = Request::delete(address.url_path())
            .header("Accept", "application/json")
            .body(vec![])
            .map_err(kube::Error::HttpError)?;
        let _status: Value = self.client.request(req).await?;
        Ok(())
    }
}
