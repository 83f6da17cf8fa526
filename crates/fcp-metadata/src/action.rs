use fcp_uri::Uri;

/// Default re-insert increment for a `DateRedirect`, in seconds (one day).
pub const DEFAULT_INCREMENT: u32 = 0x0001_5180;

/// What a document resolves to once its target is followed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Action {
    /// The document carries data directly; there is nothing further to fetch.
    #[default]
    None,
    /// Fetch `target` instead of this document.
    Redirect(Uri),
    /// Fetch a date-indexed edition of `target`, re-derived at resolve time.
    DateRedirect {
        target: Uri,
        increment: u32,
        offset: u32,
    },
    /// The document's data is split across `chunks`, each `splitsize` bytes
    /// (the final chunk may be shorter).
    SplitFile { splitsize: u32, chunks: Vec<Uri> },
}

impl Action {
    pub fn is_none(&self) -> bool {
        matches!(self, Action::None)
    }
}
