/// The 4-character trailing tag on an SSK public hash, identifying the node
/// flavor the key was generated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PubSuffix {
    /// `PAgM` — standard Freenet node.
    Standard,
    /// `BCMA` — Entropy node flavor.
    Entropy,
}

impl PubSuffix {
    pub const STANDARD_TAG: &'static str = "PAgM";
    pub const ENTROPY_TAG: &'static str = "BCMA";

    pub fn as_str(&self) -> &'static str {
        match self {
            PubSuffix::Standard => Self::STANDARD_TAG,
            PubSuffix::Entropy => Self::ENTROPY_TAG,
        }
    }

    /// Matches a 4-character trailing tag against the known suffixes.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            Self::STANDARD_TAG => Some(PubSuffix::Standard),
            Self::ENTROPY_TAG => Some(PubSuffix::Entropy),
            _ => None,
        }
    }

    /// Selects the suffix a node advertises for itself during handshake:
    /// `BCMA` iff the node reports itself as `entropy`, else `PAgM`.
    pub fn for_node_type(node_type: &str) -> Self {
        if node_type.eq_ignore_ascii_case("entropy") {
            PubSuffix::Entropy
        } else {
            PubSuffix::Standard
        }
    }
}
