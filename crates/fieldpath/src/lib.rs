//! Path expressions over open-schema json documents.
//!
//! A path is a sequence of [`Element`]s, written as `.metadata.labels."app.kubernetes.io/name"`,
//! `.spec.containers[0]` or `.spec.containers[name="nginx"].image`.

mod element;
mod error;
mod ext;
mod parse;
mod path;

pub use element::Element;
pub use error::*;
pub use ext::FieldpathExt;
pub use parse::parse;
pub use path::{Path, PathBuf};

/// Construct &Path without parsing
#[macro_export]
macro_rules! path {
    ($(.$text:literal)+) => {
        &[$($crate::Element::StaticField($text)),+][..] as &$crate::Path
    };
}
