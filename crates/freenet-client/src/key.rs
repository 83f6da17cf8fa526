use fcp_metadata::Metadata;
use fcp_uri::Uri;

/// A key fetched from (or about to be inserted into) Freenet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    pub data: Vec<u8>,
    pub metadata: Metadata,
    pub uri: Uri,
    pub mimetype: Option<String>,
}

impl Key {
    pub fn new(data: Vec<u8>, metadata: Metadata, uri: Uri) -> Self {
        Key {
            data,
            metadata,
            uri,
            mimetype: None,
        }
    }

    pub fn with_mimetype(mut self, mimetype: impl Into<String>) -> Self {
        self.mimetype = Some(mimetype.into());
        self
    }
}

/// The result of an insert: the URI the node assigned the data, plus the
/// SSK keypair halves the node reports back when inserting under a fresh
/// signed-subspace key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertResult {
    pub uri: Uri,
    pub public_key: Option<String>,
    pub private_key: Option<String>,
}
