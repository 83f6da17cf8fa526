//! Smart retrieval resolver: follows `Redirect`/`DateRedirect` chains and
//! dispatches to the FEC engine for splitfiles. Spec.md §4.E (`get_smart`).
//!
//! The chain is walked iteratively rather than by recursive stack frames
//! (spec.md §9 design note), so the cycle guard is just a loop counter
//! bounded by [`ClientConfig::max_redirect_depth`].

use fcp_metadata::{Metadata, MetadataError, TargetUri};
use fcp_uri::{Uri, UriError};

use crate::config::ClientConfig;
use crate::error::Error;
use crate::fec;
use crate::key::Key;
use crate::raw;

const DEFAULT_MIMETYPE: &str = "text/plain";

/// Splits an MSK path on its first `//` hop, returning the segment to look
/// up as a document name and whatever's left for the next hop.
fn split_msk_path(msk_path: &str) -> (String, Option<String>) {
    match msk_path.split_once("//") {
        Some((first, rest)) => (first.to_string(), Some(rest.to_string())),
        None => (msk_path.to_string(), None),
    }
}

fn join_msk_path(resolved: Option<String>, remaining: Option<String>) -> Option<String> {
    match (resolved, remaining) {
        (Some(a), Some(b)) => Some(format!("{a}//{b}")),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

/// Follows `uri` through any redirect / date-redirect / splitfile chain
/// until terminal data is reached, retrying splitfile reconstruction up to
/// `numtries` times.
pub async fn get_smart(
    config: &ClientConfig,
    uri: &Uri,
    htl: u32,
    past: i64,
    numtries: u32,
) -> Result<Key, Error> {
    let mut current = uri.clone();
    let mut mimetype = DEFAULT_MIMETYPE.to_string();

    for _ in 0..config.max_redirect_depth {
        let msk_path = current.msk_path().map(str::to_string);
        let bare = current.clone().with_msk_path_opt(None);

        let (data, meta_bytes) = raw::get_raw_bytes(config, &bare, htl, numtries).await?;
        if meta_bytes.is_empty() {
            return Ok(Key::new(data, Metadata::empty(), bare).with_mimetype(mimetype));
        }
        let metadata = Metadata::parse(&String::from_utf8_lossy(&meta_bytes), false)?;

        let (doc, remaining) = match &msk_path {
            Some(p) => split_msk_path(p),
            None => (String::new(), None),
        };

        if let Some(doc_mime) = metadata.document(&doc).and_then(|d| d.mimetype.clone()) {
            mimetype = doc_mime;
        }

        let target_uri = match metadata.target_uri(&doc, -past) {
            Ok(target_uri) => target_uri,
            Err(MetadataError::Uri(UriError::DbrNotAllowed(_))) => {
                return Err(Error::DbrNotAllowed);
            }
            Err(err) => return Err(err.into()),
        };

        match target_uri {
            TargetUri::Terminal => {
                return Ok(Key::new(data, metadata, bare).with_mimetype(mimetype));
            }
            TargetUri::Single(target) => {
                let next_msk = join_msk_path(target.msk_path().map(str::to_string), remaining);
                current = target.with_msk_path_opt(next_msk);
            }
            TargetUri::SplitFile(_) => {
                let mut last_err = None;
                for attempt in 0..numtries.max(1) {
                    match fec::fetch_splitfile(config, &meta_bytes, htl).await {
                        Ok(reassembled) => {
                            return Ok(Key::new(reassembled, metadata, current.clone())
                                .with_mimetype(mimetype));
                        }
                        Err(err) => {
                            log::debug!(
                                "get_smart: splitfile fetch attempt {}/{numtries} of {current} failed: {err}",
                                attempt + 1
                            );
                            last_err = Some(err);
                        }
                    }
                }
                return Err(last_err.expect("loop runs at least once"));
            }
        }
    }

    Err(Error::RedirectDepthExceeded(uri.render()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_msk_path_splits_on_first_double_slash() {
        assert_eq!(
            split_msk_path("docs//nested/index.html"),
            ("docs".to_string(), Some("nested/index.html".to_string()))
        );
    }

    #[test]
    fn split_msk_path_with_no_double_slash_is_whole_path() {
        assert_eq!(
            split_msk_path("docs/index.html"),
            ("docs/index.html".to_string(), None)
        );
    }

    #[test]
    fn join_msk_path_reconstructs_both_halves() {
        assert_eq!(
            join_msk_path(Some("a".to_string()), Some("b".to_string())),
            Some("a//b".to_string())
        );
        assert_eq!(join_msk_path(None, None), None);
        assert_eq!(join_msk_path(Some("a".to_string()), None), Some("a".to_string()));
        assert_eq!(join_msk_path(None, Some("b".to_string())), Some("b".to_string()));
    }

    #[test]
    fn dbr_not_allowed_from_metadata_maps_to_the_taxonomy_variant() {
        let target = Uri::chk_template();
        let err = target.dbr(-1, 86400, 0).unwrap_err();
        assert!(matches!(err, UriError::DbrNotAllowed(_)));

        let wrapped = MetadataError::from(err);
        let mapped = match wrapped {
            MetadataError::Uri(UriError::DbrNotAllowed(_)) => Error::DbrNotAllowed,
            other => panic!("expected MetadataError::Uri(UriError::DbrNotAllowed), got {other:?}"),
        };
        assert!(matches!(mapped, Error::DbrNotAllowed));
    }
}
