//! Forward-error-corrected splitfile insert and fetch.
//!
//! The node does the actual Reed-Solomon-style encode/decode math; this
//! module only drives the five FCP primitives (`FECSegmentFile`,
//! `FECEncodeSegment`, `FECSegmentSplitFile`, `FECDecodeSegment`,
//! `FECMakeMetadata`) and fans block I/O out across the [`Dispatcher`].

use std::collections::BTreeMap;

use fcp_metadata::Metadata;
use fcp_transport::FcpConnection;
use fcp_uri::Uri;
use rand::seq::index::sample;
use tokio::net::TcpStream;

use crate::config::ClientConfig;
use crate::dispatcher::Dispatcher;
use crate::error::Error;
use crate::key::InsertResult;
use crate::raw;
use crate::session::FcpSession;

/// Algorithm name the node is asked to segment/encode/decode with.
const FEC_ALGORITHM: &str = "OnionFEC_a_1_2";

/// A non-CHK metadata insert above this size gets redirected through a CHK
/// instead.
pub const METADATA_SIZE_LIMIT: usize = 32_000;

/// `put` routes data through this engine once it's larger than this many
/// bytes.
pub const SPLITFILE_THRESHOLD: usize = 1024 * 1024;

/// A `SegmentHeader` as handed back by the node: the sizing parameters of
/// one FEC segment. Kept alongside the raw field map it was parsed from so
/// it can be resent verbatim in later messages about the same segment.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SegmentHeader {
    block_count: u32,
    check_block_count: u32,
    blocks_required: u32,
    block_size: u32,
    check_block_size: u32,
    segments: u32,
    segment_num: u32,
    offset: u64,
    file_length: u64,
    fields: BTreeMap<String, String>,
}

impl SegmentHeader {
    fn from_fields(fields: BTreeMap<String, String>) -> Result<Self, Error> {
        let u32_field = |name: &str| -> Result<u32, Error> {
            let value = fields
                .get(name)
                .ok_or_else(|| Error::Protocol(format!("SegmentHeader missing field {name}")))?;
            u32::from_str_radix(value, 16)
                .map_err(|_| Error::Protocol(format!("SegmentHeader field {name} is not hex: {value:?}")))
        };
        let u64_field = |name: &str| -> Result<u64, Error> {
            let value = fields
                .get(name)
                .ok_or_else(|| Error::Protocol(format!("SegmentHeader missing field {name}")))?;
            u64::from_str_radix(value, 16)
                .map_err(|_| Error::Protocol(format!("SegmentHeader field {name} is not hex: {value:?}")))
        };

        Ok(SegmentHeader {
            block_count: u32_field("BlockCount")?,
            check_block_count: u32_field("CheckBlockCount")?,
            blocks_required: u32_field("BlocksRequired")?,
            block_size: u32_field("BlockSize")?,
            check_block_size: u32_field("CheckBlockSize")?,
            segments: u32_field("Segments")?,
            segment_num: u32_field("SegmentNum")?,
            offset: u64_field("Offset")?,
            file_length: u64_field("FileLength")?,
            fields,
        })
    }

    /// Renders this header back to the `SegmentHeader\n...\nEndMessage\n`
    /// text the node expects as the metadata half of `FECEncodeSegment` and
    /// `FECDecodeSegment`, and as one list entry in `FECMakeMetadata`.
    fn render(&self) -> String {
        let mut out = String::from("SegmentHeader\n");
        for (field, value) in &self.fields {
            out.push_str(&format!("{field}={value}\n"));
        }
        out.push_str("EndMessage\n");
        out
    }

    /// How many bytes of the source file fall within this segment, after
    /// truncating the final segment to what's left of `FileLength`.
    fn segment_len(&self) -> usize {
        if self.segments > 1 && self.segment_num < self.segments - 1 {
            self.block_count as usize * self.block_size as usize
        } else {
            (self.file_length - self.offset) as usize
        }
    }
}

/// The URIs a segment's data and check blocks were inserted under (insert
/// path) or were found at (fetch path). Indexed from 0, matching the wire
/// `Block.<hex>`/`Check.<hex>` fields — distinct from the 1-based indexing
/// `fcp_metadata::Action::SplitFile` uses for its own `SplitFile.Block.<n>`
/// fields, which is a different message context.
#[derive(Debug, Clone)]
struct BlockMap {
    block_uris: Vec<Uri>,
    check_uris: Vec<Uri>,
}

impl BlockMap {
    fn render_fields(&self) -> String {
        let mut out = String::new();
        for (i, u) in self.block_uris.iter().enumerate() {
            out.push_str(&format!("Block.{i:x}={}\n", u.render()));
        }
        for (i, u) in self.check_uris.iter().enumerate() {
            out.push_str(&format!("Check.{i:x}={}\n", u.render()));
        }
        out
    }
}

fn parse_block_map(header: &SegmentHeader, fields: BTreeMap<String, String>) -> Result<BlockMap, Error> {
    let mut block_uris: Vec<Option<Uri>> = vec![None; header.block_count as usize];
    let mut check_uris: Vec<Option<Uri>> = vec![None; header.check_block_count as usize];

    for (field, value) in fields {
        if let Some(hex_idx) = field.strip_prefix("Block.") {
            let idx = usize::from_str_radix(hex_idx, 16)
                .map_err(|_| Error::Protocol(format!("bad BlockMap index: {field:?}")))?;
            if let Some(slot) = block_uris.get_mut(idx) {
                *slot = Some(Uri::parse(&value)?);
            }
        } else if let Some(hex_idx) = field.strip_prefix("Check.") {
            let idx = usize::from_str_radix(hex_idx, 16)
                .map_err(|_| Error::Protocol(format!("bad BlockMap index: {field:?}")))?;
            if let Some(slot) = check_uris.get_mut(idx) {
                *slot = Some(Uri::parse(&value)?);
            }
        }
    }

    let block_uris = block_uris
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| Error::Protocol("BlockMap is missing a data block entry".to_string()))?;
    let check_uris = check_uris
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| Error::Protocol("BlockMap is missing a check block entry".to_string()))?;

    Ok(BlockMap { block_uris, check_uris })
}

/// Reads one `Name\n(Field=Value\n)*EndMessage\n` message, failing unless
/// the name line matches `expected`.
///
/// A `Failed` reply (spec.md §6's node→client name for "the node rejected
/// this FEC request") is reported as [`Error::Fec`] with whatever `Reason`
/// field the node sent, rather than the generic "wrong message name"
/// [`Error::Protocol`] used for anything else unexpected here.
async fn read_named_fields(
    conn: &mut FcpConnection<TcpStream>,
    expected: &'static str,
) -> Result<BTreeMap<String, String>, Error> {
    let name = conn.recv_line().await?;
    if name == "Failed" {
        return Err(fec_failed(conn).await?);
    }
    if name != expected {
        return Err(Error::Protocol(format!("expected {expected}, got {name:?}")));
    }
    let mut fields = BTreeMap::new();
    loop {
        let line = conn.recv_line().await?;
        if line == "EndMessage" {
            break;
        }
        let (field, value) = line
            .split_once('=')
            .ok_or_else(|| Error::Protocol(format!("malformed {expected} field: {line:?}")))?;
        fields.insert(field.to_string(), value.to_string());
    }
    Ok(fields)
}

/// Drains a `Failed` message's fields and builds the [`Error::Fec`] it
/// reports, using its `Reason` field if present.
async fn fec_failed(conn: &mut FcpConnection<TcpStream>) -> Result<Error, Error> {
    let mut reason = None;
    loop {
        let line = conn.recv_line().await?;
        if line == "EndMessage" {
            break;
        }
        if let Some((field, value)) = line.split_once('=') {
            if field == "Reason" {
                reason = Some(value.to_string());
            }
        }
    }
    Ok(Error::Fec(reason.unwrap_or_else(|| "node reported Failed with no reason".to_string())))
}

async fn drain_to_end_message(conn: &mut FcpConnection<TcpStream>) -> Result<(), Error> {
    loop {
        if conn.recv_line().await? == "EndMessage" {
            return Ok(());
        }
    }
}

fn parse_hex_usize(value: &str) -> Result<usize, Error> {
    usize::from_str_radix(value.trim(), 16)
        .map_err(|_| Error::Protocol(format!("bad hex field: {value:?}")))
}

fn hex_list(indices: &[u32]) -> String {
    indices.iter().map(|i| format!("{i:x}")).collect::<Vec<_>>().join(",")
}

/// Zero-pads a segment's worth of bytes read from `data` at `header.offset`,
/// so every segment (including the last, short one) is a full
/// `BlockCount * BlockSize` for encoding.
fn read_segment(data: &[u8], header: &SegmentHeader) -> Vec<u8> {
    let seg_capacity = header.block_count as usize * header.block_size as usize;
    let offset = header.offset as usize;
    let mut buf = vec![0u8; seg_capacity];
    let available = data.len().saturating_sub(offset).min(seg_capacity);
    buf[..available].copy_from_slice(&data[offset..offset + available]);
    buf
}

async fn segment_file(config: &ClientConfig, file_length: u64) -> Result<Vec<SegmentHeader>, Error> {
    let mut session = FcpSession::connect(&config.host, config.port).await?;
    let conn = session.conn_mut();

    conn.send_line("FECSegmentFile").await?;
    conn.send_line(&format!("AlgoName={FEC_ALGORITHM}")).await?;
    conn.send_line(&format!("FileLength={file_length:x}")).await?;
    conn.send_line("EndMessage").await?;

    let first = SegmentHeader::from_fields(read_named_fields(conn, "SegmentHeader").await?)?;
    let total = first.segments.max(1);
    let mut headers = Vec::with_capacity(total as usize);
    headers.push(first);
    while (headers.len() as u32) < total {
        headers.push(SegmentHeader::from_fields(
            read_named_fields(conn, "SegmentHeader").await?,
        )?);
    }
    Ok(headers)
}

async fn encode_segment(
    config: &ClientConfig,
    header: &SegmentHeader,
    segment_bytes: &[u8],
) -> Result<Vec<Vec<u8>>, Error> {
    let mut session = FcpSession::connect(&config.host, config.port).await?;
    let conn = session.conn_mut();

    let header_bytes = header.render();
    let data_len = header_bytes.len() + segment_bytes.len();

    conn.send_line("FECEncodeSegment").await?;
    conn.send_line(&format!("DataLength={data_len:x}")).await?;
    conn.send_line(&format!("MetadataLength={:x}", header_bytes.len())).await?;
    conn.send_line("Data").await?;
    conn.send_bytes(header_bytes.as_bytes()).await?;
    conn.send_bytes(segment_bytes).await?;

    let resp = conn.recv_line().await?;
    if resp == "Failed" {
        return Err(fec_failed(conn).await?);
    }
    if resp != "BlocksEncoded" {
        return Err(Error::Protocol(format!("expected BlocksEncoded, got {resp:?}")));
    }
    drain_to_end_message(conn).await?;

    let total = header.check_block_count as usize * header.check_block_size as usize;
    let bytes = conn
        .recv_key_data(total)
        .await?
        .ok_or_else(|| Error::Protocol("node restarted mid FECEncodeSegment response".to_string()))?;

    Ok(bytes
        .chunks(header.check_block_size as usize)
        .map(<[u8]>::to_vec)
        .collect())
}

/// Inserts one block forever, retrying every 5 seconds on failure. Spec.md
/// §7: "FEC block inserts retry forever with a fixed 5-second delay".
async fn insert_block_forever(config: &ClientConfig, data: Vec<u8>, htl: u32) -> Uri {
    loop {
        match raw::put_raw(config, &data, &[], None, htl).await {
            Ok(result) => return result.uri,
            Err(err) => {
                log::warn!("FEC block insert failed, retrying in 5s: {err}");
                tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            }
        }
    }
}

async fn insert_segment_blocks(
    config: &ClientConfig,
    header: &SegmentHeader,
    segment_bytes: &[u8],
    check_blocks: &[Vec<u8>],
    htl: u32,
) -> BlockMap {
    let block_size = header.block_size as usize;
    let mut dispatcher: Dispatcher<(bool, usize, Uri)> = Dispatcher::new(config.fec_workers);

    for i in 0..header.block_count as usize {
        let chunk = segment_bytes[i * block_size..(i + 1) * block_size].to_vec();
        let config = config.clone();
        dispatcher.add(async move {
            let uri = insert_block_forever(&config, chunk, htl).await;
            (true, i, uri)
        });
    }
    for (i, chunk) in check_blocks.iter().cloned().enumerate() {
        let config = config.clone();
        dispatcher.add(async move {
            let uri = insert_block_forever(&config, chunk, htl).await;
            (false, i, uri)
        });
    }

    let mut block_uris: Vec<Option<Uri>> = vec![None; header.block_count as usize];
    let mut check_uris: Vec<Option<Uri>> = vec![None; header.check_block_count as usize];
    for (is_data, idx, uri) in dispatcher.wait().await {
        if is_data {
            block_uris[idx] = Some(uri);
        } else {
            check_uris[idx] = Some(uri);
        }
    }

    BlockMap {
        block_uris: block_uris
            .into_iter()
            .map(|u| u.expect("every data block either inserted or is still retrying"))
            .collect(),
        check_uris: check_uris
            .into_iter()
            .map(|u| u.expect("every check block either inserted or is still retrying"))
            .collect(),
    }
}

async fn make_metadata(
    config: &ClientConfig,
    segments: &[(SegmentHeader, BlockMap)],
    mimetype: Option<&str>,
    description: Option<&str>,
) -> Result<Vec<u8>, Error> {
    let mut list = String::new();
    for (header, map) in segments {
        list.push_str(&header.render());
        list.push_str("BlockMap\n");
        list.push_str(&map.render_fields());
        list.push_str("EndMessage\n");
    }

    let mut session = FcpSession::connect(&config.host, config.port).await?;
    let conn = session.conn_mut();

    conn.send_line("FECMakeMetadata").await?;
    conn.send_line(&format!("Segments={:x}", segments.len())).await?;
    if let Some(desc) = description {
        conn.send_line(&format!("Description={desc}")).await?;
    }
    if let Some(mimetype) = mimetype {
        conn.send_line(&format!("MimeType={mimetype}")).await?;
    }
    conn.send_line(&format!("DataLength={:x}", list.len())).await?;
    conn.send_line("Data").await?;
    conn.send_bytes(list.as_bytes()).await?;

    let fields = read_named_fields(conn, "MadeMetadata").await?;
    let data_length = fields
        .get("DataLength")
        .ok_or_else(|| Error::Protocol("MadeMetadata missing DataLength".to_string()))
        .and_then(|v| parse_hex_usize(v))?;

    conn.recv_key_data(data_length)
        .await?
        .ok_or_else(|| Error::Protocol("node restarted mid FECMakeMetadata response".to_string()))
}

/// Segments, encodes, and inserts `data` as a splitfile, then inserts the
/// resulting metadata at `uri` (transparently CHK-redirected if it would
/// exceed [`METADATA_SIZE_LIMIT`]). Spec.md §4.G insert path.
pub async fn insert(
    config: &ClientConfig,
    data: &[u8],
    uri: &Uri,
    htl: u32,
    mimetype: Option<&str>,
    description: Option<&str>,
) -> Result<InsertResult, Error> {
    let headers = segment_file(config, data.len() as u64).await?;

    let mut segments = Vec::with_capacity(headers.len());
    for header in headers {
        let segment_bytes = read_segment(data, &header);
        let check_blocks = encode_segment(config, &header, &segment_bytes).await?;
        let block_map = insert_segment_blocks(config, &header, &segment_bytes, &check_blocks, htl).await;
        segments.push((header, block_map));
    }

    let meta_bytes = make_metadata(config, &segments, mimetype, description).await?;
    put_metadata(config, &meta_bytes, uri, htl).await
}

/// Inserts raw metadata bytes at `uri`, transparently CHK-redirecting
/// through a separate insert when `meta_bytes` would exceed
/// [`METADATA_SIZE_LIMIT`] for a non-CHK key. Shared by the splitfile
/// insert path above and the freesite composer, which both insert
/// hand-built metadata documents rather than file data.
pub(crate) async fn put_metadata(
    config: &ClientConfig,
    meta_bytes: &[u8],
    uri: &Uri,
    htl: u32,
) -> Result<InsertResult, Error> {
    if meta_bytes.len() >= METADATA_SIZE_LIMIT {
        let chk = raw::put_raw(config, &[], meta_bytes, None, htl).await?;
        let mut redirect = Metadata::empty();
        redirect.add_redirect("", chk.uri);
        raw::put_raw(config, &[], redirect.render().as_bytes(), Some(uri), htl).await
    } else {
        raw::put_raw(config, &[], meta_bytes, Some(uri), htl).await
    }
}

async fn segment_split_file(
    config: &ClientConfig,
    meta_bytes: &[u8],
) -> Result<Vec<(SegmentHeader, BlockMap)>, Error> {
    let mut session = FcpSession::connect(&config.host, config.port).await?;
    let conn = session.conn_mut();

    conn.send_line("FECSegmentSplitFile").await?;
    conn.send_line(&format!("DataLength={:x}", meta_bytes.len())).await?;
    conn.send_line("Data").await?;
    conn.send_bytes(meta_bytes).await?;

    let first_header = SegmentHeader::from_fields(read_named_fields(conn, "SegmentHeader").await?)?;
    let total = first_header.segments.max(1);
    let first_map = parse_block_map(&first_header, read_named_fields(conn, "BlockMap").await?)?;

    let mut out = Vec::with_capacity(total as usize);
    out.push((first_header, first_map));
    while (out.len() as u32) < total {
        let header = SegmentHeader::from_fields(read_named_fields(conn, "SegmentHeader").await?)?;
        let map = parse_block_map(&header, read_named_fields(conn, "BlockMap").await?)?;
        out.push((header, map));
    }
    Ok(out)
}

/// Picks `header.blocks_required` distinct indices out of
/// `[0, block_count + check_block_count)`, uniformly and without
/// replacement (spec.md §4.G fetch path step 2).
fn choose_block_indices(header: &SegmentHeader) -> (Vec<u32>, Vec<u32>) {
    let total = (header.block_count + header.check_block_count) as usize;
    let required = (header.blocks_required as usize).min(total);
    let mut rng = rand::thread_rng();
    let chosen = sample(&mut rng, total, required);

    let mut data_indices = Vec::new();
    let mut check_indices = Vec::new();
    for idx in chosen.iter() {
        let idx = idx as u32;
        if idx < header.block_count {
            data_indices.push(idx);
        } else {
            check_indices.push(idx - header.block_count);
        }
    }
    data_indices.sort_unstable();
    check_indices.sort_unstable();
    (data_indices, check_indices)
}

async fn decode_segment(
    config: &ClientConfig,
    header: &SegmentHeader,
    fetched: &[u8],
    data_indices: &[u32],
    check_indices: &[u32],
    requested_indices: &[u32],
) -> Result<Vec<Vec<u8>>, Error> {
    let header_bytes = header.render();
    let data_len = header_bytes.len() + fetched.len();
    let check_list: Vec<u32> = check_indices.iter().map(|i| i + header.block_count).collect();

    let mut session = FcpSession::connect(&config.host, config.port).await?;
    let conn = session.conn_mut();

    conn.send_line("FECDecodeSegment").await?;
    conn.send_line(&format!("DataLength={data_len:x}")).await?;
    conn.send_line(&format!("MetadataLength={:x}", header_bytes.len())).await?;
    conn.send_line(&format!("BlockList={}", hex_list(data_indices))).await?;
    conn.send_line(&format!("CheckList={}", hex_list(&check_list))).await?;
    conn.send_line(&format!("RequestedList={}", hex_list(requested_indices)))
        .await?;
    conn.send_line("Data").await?;
    conn.send_bytes(header_bytes.as_bytes()).await?;
    conn.send_bytes(fetched).await?;

    let resp = conn.recv_line().await?;
    if resp == "Failed" {
        return Err(fec_failed(conn).await?);
    }
    if resp != "BlocksDecoded" {
        return Err(Error::Protocol(format!("expected BlocksDecoded, got {resp:?}")));
    }
    drain_to_end_message(conn).await?;

    let total = requested_indices.len() * header.block_size as usize;
    let bytes = conn
        .recv_key_data(total)
        .await?
        .ok_or_else(|| Error::Protocol("node restarted mid FECDecodeSegment response".to_string()))?;

    Ok(bytes.chunks(header.block_size as usize).map(<[u8]>::to_vec).collect())
}

async fn fetch_segment(
    config: &ClientConfig,
    header: &SegmentHeader,
    block_map: &BlockMap,
    htl: u32,
) -> Result<Vec<u8>, Error> {
    let (data_indices, check_indices) = choose_block_indices(header);

    let mut dispatcher: Dispatcher<(bool, u32, Result<Vec<u8>, Error>)> = Dispatcher::new(config.fec_workers);
    for &idx in &data_indices {
        let target = block_map.block_uris[idx as usize].clone();
        let config = config.clone();
        dispatcher.add(async move {
            let result = raw::get_raw_bytes(&config, &target, htl, 1).await.map(|(data, _)| data);
            (true, idx, result)
        });
    }
    for &idx in &check_indices {
        let target = block_map.check_uris[idx as usize].clone();
        let config = config.clone();
        dispatcher.add(async move {
            let result = raw::get_raw_bytes(&config, &target, htl, 1).await.map(|(data, _)| data);
            (false, idx, result)
        });
    }

    let mut data_blocks: BTreeMap<u32, Vec<u8>> = BTreeMap::new();
    let mut check_blocks: BTreeMap<u32, Vec<u8>> = BTreeMap::new();
    for (is_data, idx, result) in dispatcher.wait().await {
        let bytes = result?;
        if is_data {
            data_blocks.insert(idx, bytes);
        } else {
            check_blocks.insert(idx, bytes);
        }
    }

    let requested_indices: Vec<u32> = (0..header.block_count)
        .filter(|i| !data_blocks.contains_key(i))
        .collect();

    let decoded = if requested_indices.is_empty() {
        Vec::new()
    } else {
        let mut fetched_concat = Vec::new();
        for &idx in &data_indices {
            fetched_concat.extend_from_slice(&data_blocks[&idx]);
        }
        for &idx in &check_indices {
            fetched_concat.extend_from_slice(&check_blocks[&idx]);
        }
        decode_segment(config, header, &fetched_concat, &data_indices, &check_indices, &requested_indices).await?
    };

    let block_size = header.block_size as usize;
    let mut segment = vec![0u8; header.block_count as usize * block_size];
    for &idx in &data_indices {
        let start = idx as usize * block_size;
        segment[start..start + block_size].copy_from_slice(&data_blocks[&idx]);
    }
    for (decoded_block, &idx) in decoded.iter().zip(requested_indices.iter()) {
        let start = idx as usize * block_size;
        segment[start..start + block_size].copy_from_slice(decoded_block);
    }

    segment.truncate(header.segment_len());
    Ok(segment)
}

/// Fetches and reassembles a splitfile whose manifest is the raw bytes
/// `meta_bytes` as received from the node (not a re-render of a parsed
/// [`Metadata`], which could reorder fields relative to what the node
/// actually stored). Spec.md §4.G fetch path.
pub async fn fetch_splitfile(config: &ClientConfig, meta_bytes: &[u8], htl: u32) -> Result<Vec<u8>, Error> {
    let segments = segment_split_file(config, meta_bytes).await?;

    let file_length = segments
        .first()
        .map(|(header, _)| header.file_length)
        .unwrap_or(0);

    let mut out = Vec::with_capacity(file_length as usize);
    for (header, block_map) in &segments {
        out.extend(fetch_segment(config, header, block_map, htl).await?);
    }
    out.truncate(file_length as usize);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(fields: &[(&str, &str)]) -> SegmentHeader {
        SegmentHeader::from_fields(fields.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()).unwrap()
    }

    #[test]
    fn segment_header_renders_fields_it_was_parsed_from() {
        let h = header(&[
            ("BlockCount", "4"),
            ("CheckBlockCount", "4"),
            ("BlocksRequired", "4"),
            ("BlockSize", "8000"),
            ("CheckBlockSize", "8000"),
            ("Segments", "1"),
            ("SegmentNum", "0"),
            ("Offset", "0"),
            ("FileLength", "186a0"),
        ]);
        let rendered = h.render();
        assert!(rendered.starts_with("SegmentHeader\n"));
        assert!(rendered.ends_with("EndMessage\n"));
        assert!(rendered.contains("FileLength=186a0\n"));
    }

    #[test]
    fn read_segment_zero_pads_the_final_short_segment() {
        let h = header(&[
            ("BlockCount", "2"),
            ("CheckBlockCount", "2"),
            ("BlocksRequired", "2"),
            ("BlockSize", "4"),
            ("CheckBlockSize", "4"),
            ("Segments", "1"),
            ("SegmentNum", "0"),
            ("Offset", "0"),
            ("FileLength", "5"),
        ]);
        let data = b"hello";
        let seg = read_segment(data, &h);
        assert_eq!(seg, b"hell\0o\0\0\0".to_vec());
    }

    #[test]
    fn segment_len_truncates_final_segment_to_remaining_file_length() {
        let h = header(&[
            ("BlockCount", "4"),
            ("CheckBlockCount", "4"),
            ("BlocksRequired", "4"),
            ("BlockSize", "100"),
            ("CheckBlockSize", "100"),
            ("Segments", "2"),
            ("SegmentNum", "1"),
            ("Offset", "400"),
            ("FileLength", "450"),
        ]);
        assert_eq!(h.segment_len(), 50);
    }

    #[test]
    fn segment_len_is_full_block_span_for_a_non_final_segment() {
        let h = header(&[
            ("BlockCount", "4"),
            ("CheckBlockCount", "4"),
            ("BlocksRequired", "4"),
            ("BlockSize", "100"),
            ("CheckBlockSize", "100"),
            ("Segments", "2"),
            ("SegmentNum", "0"),
            ("Offset", "0"),
            ("FileLength", "450"),
        ]);
        assert_eq!(h.segment_len(), 400);
    }

    #[test]
    fn choose_block_indices_picks_exactly_blocks_required_distinct_indices() {
        let h = header(&[
            ("BlockCount", "4"),
            ("CheckBlockCount", "4"),
            ("BlocksRequired", "4"),
            ("BlockSize", "100"),
            ("CheckBlockSize", "100"),
            ("Segments", "1"),
            ("SegmentNum", "0"),
            ("Offset", "0"),
            ("FileLength", "400"),
        ]);
        for _ in 0..20 {
            let (data, check) = choose_block_indices(&h);
            let total = data.len() + check.len();
            assert_eq!(total, 4);
            let mut seen = std::collections::HashSet::new();
            for i in &data {
                assert!(seen.insert(*i));
            }
            for i in &check {
                assert!(seen.insert(*i + h.block_count));
            }
        }
    }

    #[test]
    fn hex_list_joins_lowercase_hex_with_commas() {
        assert_eq!(hex_list(&[0, 1, 10, 255]), "0,1,a,ff");
    }

    #[test]
    fn block_map_render_fields_uses_zero_based_hex_indices() {
        let map = BlockMap {
            block_uris: vec![Uri::parse("CHK@a").unwrap(), Uri::parse("CHK@b").unwrap()],
            check_uris: vec![Uri::parse("CHK@c").unwrap()],
        };
        let rendered = map.render_fields();
        assert!(rendered.contains("Block.0=CHK@a\n"));
        assert!(rendered.contains("Block.1=CHK@b\n"));
        assert!(rendered.contains("Check.0=CHK@c\n"));
    }
}
