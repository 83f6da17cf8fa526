use fcp_uri::PubSuffix;

/// What a node's handshake told us about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub max_file_size: u64,
    pub node_type: String,
    pub node_version: String,
    pub protocol: String,
    pub pub_suffix: PubSuffix,
}

impl NodeInfo {
    pub fn is_entropy(&self) -> bool {
        self.pub_suffix == PubSuffix::Entropy
    }
}
