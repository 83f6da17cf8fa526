/// Connection and behavioral defaults for a [`crate::Client`].
///
/// Replaces the `defaultHost`/`defaultPort`/`defaultHtl` module globals of
/// the reference implementation with an explicit value constructed once and
/// threaded through every operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Hops-to-live used when a call site doesn't override it.
    pub htl: u32,
    /// Default retry budget for operations that accept a `numtries`/`tries`
    /// argument but the caller didn't specify one.
    pub max_tries: u32,
    /// Maximum redirect/msk-path chain depth `get` will follow before
    /// giving up (spec recommends 16).
    pub max_redirect_depth: u32,
    /// Bounded worker count for parallel FEC block insert/fetch.
    pub fec_workers: usize,
    /// Bounded worker count for parallel per-file inserts in a freesite.
    pub site_workers: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            host: "127.0.0.1".to_string(),
            port: 8481,
            htl: 20,
            max_tries: 1,
            max_redirect_depth: 16,
            fec_workers: 4,
            site_workers: 8,
        }
    }
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        ClientConfig {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    pub fn with_htl(mut self, htl: u32) -> Self {
        self.htl = htl;
        self
    }

    pub fn with_max_tries(mut self, max_tries: u32) -> Self {
        self.max_tries = max_tries;
        self
    }
}
