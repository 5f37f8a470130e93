use std::{fs, path::Path, sync::Arc};

use serde::Deserialize;
use serde_json::Value;
use serde_yaml_with_quirks::DeserializingQuirks;
use walkdir::WalkDir;

use crate::{
    apply::Reconciler,
    client::{DynamicClient, KubeClient},
    mapper::{DynamicRestMapper, RestMapper},
    Error, List, Resource, Result,
};

/// Decode a stream of yaml (or json) documents
///
/// Empty documents are skipped, any other document must be an object with
/// `apiVersion` and `kind`.
pub fn decode(data: &[u8]) -> Result<Vec<Resource>> {
    let text = std::str::from_utf8(data)?;
    let mut resources = Vec::new();
    for document in serde_yaml_with_quirks::Deserializer::from_str_with_quirks(
        text,
        DeserializingQuirks { old_octals: true },
    ) {
        let value = Value::deserialize(document)?;
        if let Some(resource) = Resource::from_document(value)? {
            resources.push(resource);
        }
    }
    Ok(resources)
}

fn read_file(path: &Path) -> Result<Vec<Resource>> {
    let data = fs::read(path).map_err(|source| Error::ReadPath {
        path: path.to_owned(),
        source,
    })?;
    decode(&data)
}

/// Entry point: produces [`List`]s bound to one cluster and field manager
#[derive(Clone)]
pub struct Reader {
    reconciler: Reconciler,
    http: reqwest::Client,
}

#[allow(clippy::wrong_self_convention)]
impl Reader {
    /// Connect using kubeconfig, or the in-cluster environment
    pub async fn try_default(field_manager: &str) -> Result<Self> {
        let config = kube::Config::infer()
            .await
            .map_err(|e| Error::InferConfig(Box::new(e)))?;
        Self::new(field_manager, config)
    }

    pub fn new(field_manager: &str, config: kube::Config) -> Result<Self> {
        let client = kube::Client::try_from(config)?;
        Ok(Self::from_client(field_manager, client))
    }

    pub fn from_client(field_manager: &str, client: kube::Client) -> Self {
        let client = Arc::new(KubeClient::new(client));
        let mapper = Arc::new(DynamicRestMapper::new(client.clone()));
        Self::with_parts(field_manager, client, mapper)
    }

    /// Use custom collaborators, e.g. a shared or pre-populated mapper
    pub fn with_parts(
        field_manager: &str,
        client: Arc<dyn DynamicClient>,
        mapper: Arc<dyn RestMapper>,
    ) -> Self {
        Self {
            reconciler: Reconciler {
                field_manager: field_manager.to_owned(),
                client,
                mapper,
            },
            http: reqwest::Client::new(),
        }
    }

    pub fn field_manager(&self) -> &str {
        &self.reconciler.field_manager
    }

    pub fn from_resources(&self, resources: Vec<Resource>) -> List {
        List::bound(resources, self.reconciler.clone())
    }

    pub fn from_bytes(&self, data: &[u8]) -> Result<List> {
        Ok(self.from_resources(decode(data)?))
    }

    /// Read a single file, or every file of a directory
    ///
    /// Without `recursive` only direct children of the directory are read.
    /// Symlinks are followed.
    pub fn from_path(&self, path: impl AsRef<Path>, recursive: bool) -> Result<List> {
        let path = path.as_ref();
        let metadata = fs::metadata(path).map_err(|source| Error::ReadPath {
            path: path.to_owned(),
            source,
        })?;
        if !metadata.is_dir() {
            return Ok(self.from_resources(read_file(path)?));
        }

        let mut walker = WalkDir::new(path).min_depth(1).follow_links(true);
        if !recursive {
            walker = walker.max_depth(1);
        }
        let mut resources = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|source| Error::WalkDir {
                path: path.to_owned(),
                source,
            })?;
            if entry.file_type().is_dir() {
                continue;
            }
            log::trace!("Reading {}", entry.path().display());
            resources.extend(read_file(entry.path())?);
        }
        Ok(self.from_resources(resources))
    }

    /// Fetch manifests over http(s), non-success statuses are errors
    pub async fn from_url(&self, url: &str) -> Result<List> {
        let fetch = async {
            let response = self.http.get(url).send().await?.error_for_status()?;
            response.bytes().await
        };
        let body = fetch.await.map_err(|source| Error::FetchUrl {
            url: url.to_owned(),
            source,
        })?;
        self.from_bytes(&body)
    }
}
