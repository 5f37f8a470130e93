use std::path::PathBuf;

use thiserror::Error;

use crate::mapper::MappingError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to retrieve REST mapping for {kind}: {source}")]
    Mapping { kind: String, source: MappingError },
    #[error("failed to get {kind} {name:?}: {source}")]
    Get { kind: String, name: String, source: kube::Error },
    #[error("failed to encode JSON for {kind}: {source}")]
    Encode {
        kind: String,
        source: serde_json::Error,
    },
    #[error("failed to patch {kind} {name:?}: {source}")]
    Patch { kind: String, name: String, source: kube::Error },
    #[error("failed to delete {kind} {name:?}: {source}")]
    Delete { kind: String, name: String, source: kube::Error },
    #[error("failed waiting for {kind} {name:?} to be deleted: {source}")]
    WaitForDelete { kind: String, name: String, source: kube::Error },
    #[error("timed out waiting for {kind} {name:?} to be deleted")]
    Timeout { kind: String, name: String },

    #[error("unable to parse manifest: {0}")]
    Decode(#[from] serde_yaml_with_quirks::Error),
    #[error("manifest is not valid utf-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("invalid manifest: {0}")]
    InvalidResource(String),
    #[error("invalid field path {path:?}: {message}")]
    InvalidPath { path: String, message: String },
    #[error("failed to read manifests from {path:?}: {source}")]
    ReadPath {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read manifests from dir {path:?}: {source}")]
    WalkDir {
        path: PathBuf,
        source: walkdir::Error,
    },
    #[error("failed to read manifests from URL {url:?}: {source}")]
    FetchUrl { url: String, source: reqwest::Error },

    #[error("failed to infer cluster config: {0}")]
    InferConfig(Box<dyn std::error::Error + Send + Sync>),
    #[error("kube error: {0}")]
    Kube(#[from] kube::Error),
    #[error("path error: {0}")]
    Path(#[from] fieldpath::Error),
    #[error("transform failed: {0}")]
    Transform(#[from] anyhow::Error),
}
pub type Result<T> = std::result::Result<T, Error>;
