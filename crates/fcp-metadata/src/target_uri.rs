use fcp_uri::Uri;

/// Result of resolving a document's action to something fetchable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetUri {
    /// The document is terminal: its own data is the answer.
    Terminal,
    /// Fetch this single URI instead (plain redirect, or a date redirect
    /// already resolved to a concrete edition).
    Single(Uri),
    /// Fetch every chunk and concatenate them.
    SplitFile(Vec<Uri>),
}
