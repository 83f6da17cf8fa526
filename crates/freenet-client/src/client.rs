//! Ergonomic façade over the free functions in this crate: a [`Client`]
//! just carries a [`ClientConfig`] and forwards to `raw`/`resolver`/`put`/
//! `seq`/`session`/`site`/`fec`, mirroring the original's class-based
//! `node`/`site` API while keeping the actual implementations as plain
//! functions taking `&ClientConfig`.

use fcp_uri::Uri;

use crate::config::ClientConfig;
use crate::error::Error;
use crate::fec;
use crate::key::{InsertResult, Key};
use crate::node_info::NodeInfo;
use crate::raw;
use crate::resolver;
use crate::seq;
use crate::session::FcpSession;
use crate::site::{self, DirectoryReader, FreesiteConfig, PutSiteResult, RetrievedFile, SiteOptions};

/// A configured handle to one Freenet node.
///
/// Cheap to clone: it's just a [`ClientConfig`], and every operation opens
/// its own short-lived connection (spec.md's session model — connections
/// are never shared between concurrent requests).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    config: ClientConfig,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        Client { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Performs the `ClientHello`/`NodeHello` handshake and reports the
    /// node's capabilities.
    pub async fn handshake(&self) -> Result<NodeInfo, Error> {
        FcpSession::handshake(&self.config.host, self.config.port).await
    }

    /// Queries the node's current estimated load via `ClientInfo`.
    pub async fn estimated_load(&self) -> Result<u32, Error> {
        FcpSession::estimated_load(&self.config.host, self.config.port).await
    }

    /// Fetches a key with no interpretation of its metadata.
    ///
    /// `numtries` of `None` falls back to [`ClientConfig::max_tries`].
    pub async fn get_raw(&self, uri: &Uri, htl: u32, numtries: Option<u32>) -> Result<Key, Error> {
        raw::get_raw(&self.config, uri, htl, numtries.unwrap_or(self.config.max_tries)).await
    }

    /// Follows `uri` through any redirect/date-redirect/splitfile chain to
    /// terminal data.
    ///
    /// `numtries` of `None` falls back to [`ClientConfig::max_tries`].
    pub async fn get(&self, uri: &Uri, htl: u32, past: i64, numtries: Option<u32>) -> Result<Key, Error> {
        resolver::get_smart(&self.config, uri, htl, past, numtries.unwrap_or(self.config.max_tries)).await
    }

    /// Lower-level insert: sends `data`/`meta` as-is, no FEC, no CHK
    /// redirect rewrite for oversized non-CHK inserts.
    pub async fn put_raw(&self, data: &[u8], meta: &[u8], uri: Option<&Uri>, htl: u32) -> Result<InsertResult, Error> {
        raw::put_raw(&self.config, data, meta, uri, htl).await
    }

    /// Inserts `data`, choosing the direct/CHK-redirect/FEC wire path by
    /// size and key type.
    pub async fn put(&self, data: &[u8], uri: Option<&Uri>, htl: u32, mimetype: Option<&str>) -> Result<InsertResult, Error> {
        crate::put::put(&self.config, data, uri, htl, mimetype).await
    }

    /// Computes the CHK a block of data+metadata would be inserted under.
    pub async fn gen_chk(&self, data: &[u8], meta: &[u8]) -> Result<Uri, Error> {
        raw::gen_chk(&self.config, data, meta).await
    }

    /// Asks the node to mint a fresh SVK keypair.
    pub async fn gen_svk_pair(&self) -> Result<(String, String), Error> {
        raw::gen_svk_pair(&self.config).await
    }

    /// Probes whether `uri` currently exists.
    pub async fn key_exists(&self, uri: &Uri, htl: u32) -> Result<bool, Error> {
        raw::key_exists(&self.config, uri, htl).await
    }

    /// Walks `prefix{start}`, `prefix{start+1}`, ... for the first key that
    /// resolves.
    ///
    /// `numtries` of `None` falls back to [`ClientConfig::max_tries`].
    pub async fn get_seq(
        &self,
        prefix: &str,
        start: u64,
        tries: u64,
        htl: u32,
        past: i64,
        numtries: Option<u32>,
    ) -> Result<Key, Error> {
        seq::get_seq(&self.config, prefix, start, tries, htl, past, numtries.unwrap_or(self.config.max_tries)).await
    }

    /// Inserts `data` at the first unused `prefix{start}`,
    /// `prefix{start+1}`, ... key.
    pub async fn put_seq(
        &self,
        prefix: &str,
        start: u64,
        tries: u64,
        data: &[u8],
        mimetype: Option<&str>,
        htl: u32,
    ) -> Result<InsertResult, Error> {
        seq::put_seq(&self.config, prefix, start, tries, data, mimetype, htl).await
    }

    /// Scans `reader`, inserts every file in parallel, and publishes the
    /// resulting manifest per `options.site_type`.
    pub async fn put_site<R: DirectoryReader>(
        &self,
        reader: &R,
        options: &SiteOptions,
        persisted: &FreesiteConfig,
    ) -> Result<PutSiteResult, Error> {
        site::put_site(&self.config, reader, options, persisted).await
    }

    /// Reconstructs every file named in the manifest at `manifest_uri`.
    pub async fn get_site(&self, manifest_uri: &Uri, htl: u32, past: i64) -> Result<Vec<RetrievedFile>, Error> {
        site::get_site(&self.config, manifest_uri, htl, past).await
    }

    /// Fetches and reassembles a splitfile whose manifest is `meta_bytes`.
    pub async fn fetch_splitfile(&self, meta_bytes: &[u8], htl: u32) -> Result<Vec<u8>, Error> {
        fec::fetch_splitfile(&self.config, meta_bytes, htl).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_carries_its_config() {
        let config = ClientConfig::new("example.test", 1234);
        let client = Client::new(config.clone());
        assert_eq!(client.config(), &config);
    }

    #[test]
    fn numtries_none_resolves_to_the_configured_max_tries() {
        let config = ClientConfig::new("example.test", 1234).with_max_tries(7);
        let client = Client::new(config);
        assert_eq!(None.unwrap_or(client.config().max_tries), 7);
    }
}
