use fcp_metadata::Metadata;
use fcp_uri::Uri;

use crate::config::ClientConfig;
use crate::error::Error;
use crate::key::{InsertResult, Key};
use crate::session::FcpSession;

enum GetState {
    Wait,
    WaitRestart,
    Hdr,
    Meta,
    Data,
}

/// Fetches a key with no interpretation of its metadata: whatever bytes the
/// node hands back for data and metadata are returned as-is.
pub async fn get_raw(config: &ClientConfig, uri: &Uri, htl: u32, numtries: u32) -> Result<Key, Error> {
    let (data, meta) = get_raw_bytes(config, uri, htl, numtries).await?;
    let metadata = Metadata::parse(&String::from_utf8_lossy(&meta), false)?;
    Ok(Key::new(data, metadata, uri.clone()))
}

/// Like [`get_raw`] but returns the metadata as unparsed bytes, so callers
/// that need a byte-exact comparison (insert collision resolution) don't
/// pay for a parse/render round trip that could subtly rewrite it.
pub async fn get_raw_bytes(
    config: &ClientConfig,
    uri: &Uri,
    htl: u32,
    numtries: u32,
) -> Result<(Vec<u8>, Vec<u8>), Error> {
    let mut last_err = None;
    for attempt in 0..numtries.max(1) {
        match get_raw_bytes_once(config, uri, htl).await {
            Ok(result) => return Ok(result),
            Err(err @ (Error::DataNotFound(_) | Error::RouteNotFound(_))) => {
                log::debug!("get_raw: try {}/{numtries} of {uri} failed: {err}", attempt + 1);
                last_err = Some(err);
            }
            Err(err) => return Err(err),
        }
    }
    Err(last_err.expect("loop runs at least once"))
}

async fn get_raw_bytes_once(
    config: &ClientConfig,
    uri: &Uri,
    htl: u32,
) -> Result<(Vec<u8>, Vec<u8>), Error> {
    let mut session = FcpSession::connect(&config.host, config.port).await?;
    let conn = session.conn_mut();

    conn.send_line("ClientGet").await?;
    conn.send_line(&format!("URI={}", uri.render())).await?;
    conn.send_line(&format!("HopsToLive={htl:x}")).await?;
    conn.send_line("EndMessage").await?;

    let mut state = GetState::Wait;
    let mut data_len = 0usize;
    let mut meta_len = 0usize;
    let mut meta = Vec::new();

    loop {
        match state {
            GetState::Wait => {
                let resp = conn.recv_line().await?;
                match resp.as_str() {
                    "URIError" => return Err(Error::UriRejected(uri.render())),
                    "Restarted" => state = GetState::WaitRestart,
                    "DataNotFound" => return Err(Error::DataNotFound(uri.render())),
                    "RouteNotFound" => return Err(Error::RouteNotFound(uri.render())),
                    "DataFound" => state = GetState::Hdr,
                    other => {
                        return Err(Error::Protocol(format!(
                            "unexpected response to ClientGet: {other:?}"
                        )));
                    }
                }
            }
            GetState::WaitRestart => {
                let resp = conn.recv_line().await?;
                if resp == "EndMessage" {
                    state = GetState::Wait;
                }
                // `Timeout=...` lines are just progress pings; keep waiting.
            }
            GetState::Hdr => {
                data_len = 0;
                meta_len = 0;
                loop {
                    let resp = conn.recv_line().await?;
                    if resp == "EndMessage" {
                        break;
                    }
                    let (field, value) = resp
                        .split_once('=')
                        .ok_or_else(|| Error::Protocol(format!("bad DataFound field: {resp:?}")))?;
                    match field {
                        "DataLength" => {
                            data_len = usize::from_str_radix(value, 16).map_err(|_| {
                                Error::Protocol(format!("bad DataLength: {value:?}"))
                            })?;
                        }
                        "MetadataLength" => {
                            meta_len = usize::from_str_radix(value, 16).map_err(|_| {
                                Error::Protocol(format!("bad MetadataLength: {value:?}"))
                            })?;
                        }
                        _ => {}
                    }
                }
                // DataLength includes the metadata bytes that precede the data.
                data_len = data_len.saturating_sub(meta_len);
                state = if meta_len > 0 { GetState::Meta } else { GetState::Data };
            }
            GetState::Meta => match conn.recv_key_data(meta_len).await? {
                Some(bytes) => {
                    meta = bytes;
                    state = GetState::Data;
                }
                None => {
                    conn.reset_chunk_buffer();
                    state = GetState::Wait;
                }
            },
            GetState::Data => match conn.recv_key_data(data_len).await? {
                Some(data) => return Ok((data, meta)),
                None => {
                    conn.reset_chunk_buffer();
                    state = GetState::Wait;
                }
            },
        }
    }
}

/// Lower-level key insert: sends `data`/`meta` raw, with no FEC splitting
/// and no CHK-redirect rewrite for oversized non-CHK inserts (that lives in
/// the public `put`).
pub async fn put_raw(
    config: &ClientConfig,
    data: &[u8],
    meta: &[u8],
    uri: Option<&Uri>,
    htl: u32,
) -> Result<InsertResult, Error> {
    if data.is_empty() && meta.is_empty() && uri.is_none() {
        return Err(Error::Protocol(
            "put_raw: no data, no metadata, no uri".to_string(),
        ));
    }
    let insert_uri = uri.cloned().unwrap_or_else(Uri::chk_template);

    let mut session = FcpSession::connect(&config.host, config.port).await?;
    let conn = session.conn_mut();

    let meta_len = meta.len();
    let data_len = data.len() + meta_len;

    conn.send_line("ClientPut").await?;
    conn.send_line(&format!("HopsToLive={htl:x}")).await?;
    conn.send_line(&format!("URI={}", insert_uri.render())).await?;
    conn.send_line(&format!("DataLength={data_len:x}")).await?;
    if meta_len > 0 {
        conn.send_line(&format!("MetadataLength={meta_len:x}")).await?;
    }
    conn.send_line("Data").await?;
    if meta_len > 0 {
        conn.send_bytes(meta).await?;
    }
    conn.send_bytes(data).await?;

    let (result_uri, collision, public_key, private_key) = loop {
        let resp = conn.recv_line().await?;
        match resp.as_str() {
            "URIError" => return Err(Error::UriRejected(insert_uri.render())),
            "Restarted" => {
                while conn.recv_line().await? != "EndMessage" {}
                continue;
            }
            "RouteNotFound" => return Err(Error::RouteNotFound(insert_uri.render())),
            "SizeError" => return Err(Error::SizeError(insert_uri.render())),
            "Pending" => {
                while conn.recv_line().await? != "EndMessage" {}
                continue;
            }
            "Success" | "KeyCollision" => {
                let collision = resp == "KeyCollision";
                let mut new_uri = None;
                let mut public_key = None;
                let mut private_key = None;
                loop {
                    let line = conn.recv_line().await?;
                    if line == "EndMessage" {
                        break;
                    }
                    if let Some((field, value)) = line.split_once('=') {
                        match field {
                            "URI" => new_uri = Some(Uri::parse(value)?),
                            "PublicKey" => public_key = Some(value.to_string()),
                            "PrivateKey" => private_key = Some(value.to_string()),
                            _ => {}
                        }
                    }
                }
                break (
                    new_uri.unwrap_or_else(|| insert_uri.clone()),
                    collision,
                    public_key,
                    private_key,
                );
            }
            other => {
                return Err(Error::Protocol(format!(
                    "expected Success or KeyCollision from ClientPut, got {other:?}"
                )));
            }
        }
    };
    drop(session);

    if collision {
        log::debug!("put_raw: collision at {result_uri}, comparing existing content");
        let (existing_data, existing_meta) = get_raw_bytes(config, &result_uri, htl, 1).await?;
        let mut inserted = meta.to_vec();
        inserted.extend_from_slice(data);
        let mut existing = existing_meta;
        existing.extend_from_slice(&existing_data);
        if inserted != existing {
            return Err(Error::KeyCollision {
                uri: result_uri.render(),
            });
        }
        log::debug!("put_raw: collision at {result_uri} is byte-identical, treating as success");
    }

    Ok(InsertResult {
        uri: result_uri,
        public_key,
        private_key,
    })
}

/// Computes the CHK a block of data+metadata would be inserted under,
/// without actually inserting it.
pub async fn gen_chk(config: &ClientConfig, data: &[u8], meta: &[u8]) -> Result<Uri, Error> {
    let mut session = FcpSession::connect(&config.host, config.port).await?;
    let conn = session.conn_mut();

    let meta_len = meta.len();
    let data_len = data.len() + meta_len;

    conn.send_line("GenerateCHK").await?;
    conn.send_line(&format!("DataLength={data_len:x}")).await?;
    if meta_len > 0 {
        conn.send_line(&format!("MetadataLength={meta_len:x}")).await?;
    }
    conn.send_line("Data").await?;
    if meta_len > 0 {
        conn.send_bytes(meta).await?;
    }
    conn.send_bytes(data).await?;

    let resp = conn.recv_line().await?;
    if resp != "Success" {
        return Err(Error::Protocol(format!(
            "GenerateCHK: expected Success, got {resp:?}"
        )));
    }

    let mut chk = None;
    loop {
        let line = conn.recv_line().await?;
        if line == "EndMessage" {
            break;
        }
        if let Some((field, value)) = line.split_once('=') {
            if field == "URI" {
                chk = Some(Uri::parse(value)?);
            }
        }
    }
    chk.ok_or_else(|| Error::Protocol("GenerateCHK: node sent no URI".to_string()))
}

/// Asks the node to mint a fresh SVK keypair, for use as an SSK's
/// public/private half.
pub async fn gen_svk_pair(config: &ClientConfig) -> Result<(String, String), Error> {
    let mut session = FcpSession::connect(&config.host, config.port).await?;
    let conn = session.conn_mut();

    conn.send_line("GenerateSVKPair").await?;
    conn.send_line("EndMessage").await?;

    let resp = conn.recv_line().await?;
    if resp != "Success" {
        return Err(Error::Protocol(format!(
            "GenerateSVKPair: expected Success, got {resp:?}"
        )));
    }

    let mut public_key = None;
    let mut private_key = None;
    loop {
        let line = conn.recv_line().await?;
        if line == "EndMessage" {
            break;
        }
        if let Some((field, value)) = line.split_once('=') {
            match field {
                "PublicKey" => public_key = Some(value.to_string()),
                "PrivateKey" => private_key = Some(value.to_string()),
                _ => {}
            }
        }
    }

    match (public_key, private_key) {
        (Some(public_key), Some(private_key)) => Ok((public_key, private_key)),
        (None, _) => Err(Error::Protocol(
            "GenerateSVKPair: node sent no public key".to_string(),
        )),
        (_, None) => Err(Error::Protocol(
            "GenerateSVKPair: node sent no private key".to_string(),
        )),
    }
}

/// Probes whether `uri` currently exists, discarding any payload.
pub async fn key_exists(config: &ClientConfig, uri: &Uri, htl: u32) -> Result<bool, Error> {
    match get_raw_bytes(config, uri, htl, 1).await {
        Ok(_) => Ok(true),
        Err(Error::DataNotFound(_)) | Err(Error::RouteNotFound(_)) => Ok(false),
        Err(other) => Err(other),
    }
}
