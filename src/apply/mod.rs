mod delete;

use std::{
    fmt::{self, Display},
    sync::Arc,
};

use crate::{
    client::{is_not_found, ApplyParams, DynamicClient, ObjectAddress},
    mapper::{RestMapper, RestMapping},
    Error, Resource, Result,
};

pub use delete::DeleteOptions;

/// What server-side apply did to an object
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
    Created,
    Configured,
    Unchanged,
}

impl Outcome {
    fn classify(current: Option<&Resource>, applied: &Resource) -> Self {
        match current {
            None => Outcome::Created,
            Some(current) if current.resource_version() == applied.resource_version() => {
                Outcome::Unchanged
            }
            Some(_) => Outcome::Configured,
        }
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Outcome::Created => "created",
            Outcome::Configured => "configured",
            Outcome::Unchanged => "unchanged",
        })
    }
}

/// Everything needed to talk to the cluster on behalf of one field manager
#[derive(Clone)]
pub(crate) struct Reconciler {
    pub field_manager: String,
    pub client: Arc<dyn DynamicClient>,
    pub mapper: Arc<dyn RestMapper>,
}

impl Reconciler {
    async fn mapping(&self, resource: &Resource, kind: &str) -> Result<RestMapping> {
        let gvk = resource.group_version_kind();
        self.mapper
            .rest_mapping(&gvk.group_kind(), &[gvk.version.as_str()])
            .await
            .map_err(|source| Error::Mapping {
                kind: kind.to_owned(),
                source,
            })
    }

    async fn address(&self, resource: &Resource, kind: &str) -> Result<ObjectAddress> {
        let mapping = self.mapping(resource, kind).await?;
        Ok(ObjectAddress::new(
            &mapping,
            resource.namespace(),
            resource.name(),
        ))
    }

    /// Current state of the object, `None` if it does not exist yet
    async fn find(&self, resource: &Resource, kind: &str) -> Result<Option<Resource>> {
        let address = self.address(resource, kind).await?;
        log::trace!("Loading current {} {:?}", kind, resource.name());
        match self.client.get(&address).await {
            Ok(object) => Ok(Some(Resource::from_server(object))),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(source) => Err(Error::Get {
                kind: kind.to_owned(),
                name: resource.name().to_owned(),
                source,
            }),
        }
    }

    async fn patch(&self, resource: &Resource, kind: &str) -> Result<Resource> {
        let address = self.address(resource, kind).await?;
        let data = resource.to_json().map_err(|source| Error::Encode {
            kind: kind.to_owned(),
            source,
        })?;
        let params = ApplyParams {
            field_manager: self.field_manager.clone(),
            force: true,
        };
        log::trace!("Applying {} {:?}", kind, resource.name());
        self.client
            .apply(&address, data, &params)
            .await
            .map(Resource::from_server)
            .map_err(|source| Error::Patch {
                kind: kind.to_owned(),
                name: resource.name().to_owned(),
                source,
            })
    }

    /// Server-side apply a single resource
    ///
    /// The outcome is derived from the resource version before and after the patch.
    pub(crate) async fn apply(&self, resource: &Resource) -> Result<Outcome> {
        let kind = resource.group_version_kind().kind_name();
        let current = self.find(resource, &kind).await?;
        let applied = self.patch(resource, &kind).await?;

        let outcome = Outcome::classify(current.as_ref(), &applied);
        log::info!("{} {:?} {}", kind, resource.name(), outcome);
        Ok(outcome)
    }
}
