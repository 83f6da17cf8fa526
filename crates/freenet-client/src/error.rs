use thiserror::Error;

/// Errors surfaced by the Freenet client across every operation.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Uri(#[from] fcp_uri::UriError),

    #[error(transparent)]
    Metadata(#[from] fcp_metadata::MetadataError),

    #[error(transparent)]
    Transport(#[from] fcp_transport::TransportError),

    #[error("failed to connect to node at {host}:{port}")]
    Connect { host: String, port: u16 },

    /// A message arrived that the current session state didn't expect, or
    /// couldn't be parsed. Fatal to the session the error came from.
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("data not found: {0}")]
    DataNotFound(String),

    #[error("route not found: {0}")]
    RouteNotFound(String),

    #[error("node rejected uri: {0}")]
    UriRejected(String),

    #[error("insert of {0} exceeded the 32 KiB limit for non-CHK keys")]
    SizeError(String),

    #[error("key collision at {uri}: existing content differs from what was inserted")]
    KeyCollision { uri: String },

    #[error("DBR requested on a key type that doesn't support it")]
    DbrNotAllowed,

    #[error("maximum redirect depth exceeded resolving {0}")]
    RedirectDepthExceeded(String),

    #[error("sequence walk over {prefix}[{start}..{end}) found nothing")]
    SequenceExhausted { prefix: String, start: u64, end: u64 },

    #[error("edition publishing exhausted its budget ({tries} tries from edition {start})")]
    EditionsExhausted { start: u64, tries: u64 },

    #[error("FEC operation failed: {0}")]
    Fec(String),

    #[error("site configuration error: {0}")]
    SiteConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
