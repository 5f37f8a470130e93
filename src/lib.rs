//! Load sets of Kubernetes manifests, filter and transform them, then
//! reconcile them with a cluster using server-side apply.
//!
//! ```no_run
//! # async fn run() -> kube_manifest::Result<()> {
//! use kube_manifest::{filter, transform, Reader};
//!
//! let reader = Reader::try_default("my-operator").await?;
//! let manifests = reader
//!     .from_path("deploy/", true)?
//!     .filter(&[filter::not(filter::by_kind("Namespace"))])
//!     .transform(&[transform::set_namespace("prod")])?;
//! manifests.apply().await?;
//! # Ok(())
//! # }
//! ```

mod apply;
pub mod client;
mod error;
pub mod filter;
pub mod gvk;
mod list;
pub mod mapper;
mod reader;
mod resource;
pub mod transform;
pub mod wait;


pub use apply::DeleteOptions;
pub use error::{Error, Result};
pub use list::List;
pub use reader::{decode, Reader};
pub use resource::Resource;
