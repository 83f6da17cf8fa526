use std::collections::BTreeMap;

use crate::action::Action;

/// A single named part of a metadata document (the unnamed part, `""`, is
/// the default document a bare `ClientGet` resolves to).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    pub action: Action,
    pub mimetype: Option<String>,
    pub description: Option<String>,
    /// Fields present in the wire text that this crate does not interpret.
    /// Preserved so a parse-then-render round trip doesn't silently drop
    /// data a newer node might have written.
    pub extras: BTreeMap<String, String>,
}

impl Document {
    pub fn new(action: Action) -> Self {
        Document {
            action,
            ..Default::default()
        }
    }

    pub fn with_mimetype(mut self, mimetype: impl Into<String>) -> Self {
        self.mimetype = Some(mimetype.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
