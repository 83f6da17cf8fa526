use thiserror::Error;

use crate::KeyType;

/// Failure modes for parsing or rendering a key [`crate::Uri`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UriError {
    #[error("empty URI string")]
    Empty,

    #[error("URI must contain exactly one '@': {0:?}")]
    MultipleAt(String),

    #[error("missing '@' in URI: {0:?}")]
    MissingAt(String),

    #[error("unknown key type {0:?} in URI: {1:?}")]
    UnknownKeyType(String, String),

    #[error("empty hash in URI: {0:?}")]
    EmptyHash(String),

    #[error("DBR is not defined for key type {0:?}")]
    DbrNotAllowed(KeyType),
}
