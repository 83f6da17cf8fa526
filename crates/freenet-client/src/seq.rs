//! Sequenced key operations: `prefix0`, `prefix1`, `prefix2`, ... used for
//! numbered logs and archives. Spec.md's unlabeled §4 section; grounded on
//! `getseq`/`putseq` in `examples/original_source/freenet.py`.

use fcp_uri::Uri;

use crate::config::ClientConfig;
use crate::error::Error;
use crate::key::{InsertResult, Key};
use crate::put;
use crate::resolver;

/// Walks `prefix{start}`, `prefix{start+1}`, ... for up to `tries` keys and
/// returns the first one that resolves. A `DataNotFound`/`RouteNotFound` at
/// a given index just means "try the next number"; any other error, or
/// exhausting `tries` with nothing found, is surfaced.
pub async fn get_seq(
    config: &ClientConfig,
    prefix: &str,
    start: u64,
    tries: u64,
    htl: u32,
    past: i64,
    numtries: u32,
) -> Result<Key, Error> {
    let end = start.saturating_add(tries);
    for i in start..end {
        let uri = Uri::parse(&format!("{prefix}{i}"))?;
        match resolver::get_smart(config, &uri, htl, past, numtries).await {
            Ok(key) => return Ok(key),
            Err(Error::DataNotFound(_)) | Err(Error::RouteNotFound(_)) => continue,
            Err(err) => return Err(err),
        }
    }
    Err(Error::SequenceExhausted {
        prefix: prefix.to_string(),
        start,
        end,
    })
}

/// Inserts `data` at the first unused `prefix{start}`, `prefix{start+1}`,
/// ... key, skipping past any index a collision shows is already taken.
pub async fn put_seq(
    config: &ClientConfig,
    prefix: &str,
    start: u64,
    tries: u64,
    data: &[u8],
    mimetype: Option<&str>,
    htl: u32,
) -> Result<InsertResult, Error> {
    let end = start.saturating_add(tries);
    for i in start..end {
        let uri = Uri::parse(&format!("{prefix}{i}"))?;
        match put::put(config, data, Some(&uri), htl, mimetype).await {
            Ok(result) => return Ok(result),
            Err(Error::KeyCollision { .. }) | Err(Error::RouteNotFound(_)) => continue,
            Err(err) => return Err(err),
        }
    }
    Err(Error::SequenceExhausted {
        prefix: prefix.to_string(),
        start,
        end,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_seq_surfaces_a_uri_parse_error_before_touching_the_network() {
        let config = ClientConfig::new("127.0.0.1", 1);
        let err = get_seq(&config, "not a uri", 0, 3, 5, 0, 1).await.unwrap_err();
        assert!(matches!(err, Error::Uri(_)));
    }

    #[tokio::test]
    async fn put_seq_surfaces_a_uri_parse_error_before_touching_the_network() {
        let config = ClientConfig::new("127.0.0.1", 1);
        let err = put_seq(&config, "not a uri", 0, 3, b"data", None, 5).await.unwrap_err();
        assert!(matches!(err, Error::Uri(_)));
    }
}
