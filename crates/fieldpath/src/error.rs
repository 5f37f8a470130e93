use thiserror::Error;

use crate::PathBuf;

#[derive(Error, Debug)]
pub enum Error {
    #[error("empty path")]
    EmptyPath,
    #[error("field not found")]
    FieldNotFound,
    #[error("not an object")]
    NotAnObject,
    #[error("not an array")]
    NotAnArray,
    #[error("select matched multiple items")]
    SelectMatchedMultipleItems,
    #[error("select matched no items")]
    SelectMatchedNoItems,
    #[error("index out of bounds")]
    OutOfBounds,
    #[error("at {0}: {1}")]
    AtPath(PathBuf, Box<Error>),
}
pub type Result<T> = std::result::Result<T, Error>;
