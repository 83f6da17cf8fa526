//! Top-level insert dispatch: picks CHK-redirect vs. direct insert vs. FEC
//! by payload size and key type. Spec.md §4.D/§4.G insert dispatch, grounded
//! on `node.put`'s dispatch logic in `examples/original_source/freenet.py`.

use futures::future::BoxFuture;

use fcp_metadata::{Action, Document, Metadata};
use fcp_uri::{KeyType, Uri};

use crate::config::ClientConfig;
use crate::error::Error;
use crate::fec;
use crate::key::InsertResult;
use crate::raw;

/// A non-CHK insert whose payload reaches this size can no longer carry the
/// data directly — a non-CHK key's data slot is metadata-sized, not
/// payload-sized, once it crosses this line.
const NON_CHK_PAYLOAD_LIMIT: usize = 32 * 1024;

/// Inserts `data` at `uri` (or a fresh CHK if `uri` is `None`), choosing the
/// wire path by size and key type:
///
/// - A non-CHK insert whose payload is at least 32 KiB is split in two: the
///   payload goes in under a CHK, and a `Redirect` metadata document
///   pointing at that CHK is inserted at `uri` instead.
/// - A payload up to [`fec::SPLITFILE_THRESHOLD`] is inserted directly.
/// - Anything larger goes through the FEC engine.
///
/// Recursion (the CHK-redirect branch calls back into `put`) requires this
/// to return a boxed future rather than being declared `async fn`.
pub fn put<'a>(
    config: &'a ClientConfig,
    data: &'a [u8],
    uri: Option<&'a Uri>,
    htl: u32,
    mimetype: Option<&'a str>,
) -> BoxFuture<'a, Result<InsertResult, Error>> {
    Box::pin(async move {
        let insert_uri = uri.cloned().unwrap_or_else(Uri::chk_template);

        if insert_uri.kind() != KeyType::Chk && data.len() >= NON_CHK_PAYLOAD_LIMIT {
            let chk_result = put(config, data, None, htl, None).await?;
            let mut doc = Document::new(Action::Redirect(chk_result.uri));
            if let Some(mimetype) = mimetype {
                doc = doc.with_mimetype(mimetype);
            }
            let mut redirect = Metadata::empty();
            redirect.insert("", doc);
            return raw::put_raw(config, &[], redirect.render().as_bytes(), Some(&insert_uri), htl).await;
        }

        let meta_bytes = match mimetype {
            Some(mimetype) => {
                let mut meta = Metadata::empty();
                meta.insert("", Document::new(Action::None).with_mimetype(mimetype));
                meta.render().into_bytes()
            }
            None => Vec::new(),
        };

        if data.len() <= fec::SPLITFILE_THRESHOLD {
            raw::put_raw(config, data, &meta_bytes, Some(&insert_uri), htl).await
        } else {
            fec::insert(config, data, &insert_uri, htl, mimetype, None).await
        }
    })
}
