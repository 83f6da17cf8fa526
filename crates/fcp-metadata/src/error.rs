use thiserror::Error;

/// Failure modes for parsing or rendering a [`crate::Metadata`] document.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("metadata missing 'Version' header")]
    MissingHeader,

    #[error("metadata missing 'End' footer")]
    MissingFooter,

    #[error("bad or missing Revision line: {0:?}")]
    BadRevision(String),

    #[error("malformed metadata line (expected 'Field=Value'): {0:?}")]
    MalformedLine(String),

    #[error("document {0:?} is missing required field {1:?}")]
    MissingField(String, &'static str),

    #[error("no such document {0:?} in metadata map")]
    NoSuchDocument(String),

    #[error(transparent)]
    Uri(#[from] fcp_uri::UriError),
}
