//! End-to-end tests driving the real TCP code paths (`FcpSession::connect`,
//! `raw::get_raw`) against a minimal hand-rolled FCP node listening on
//! localhost, instead of mocking at the `FcpConnection` level. Mirrors the
//! teacher's `crates/smb/tests/long_dir.rs` placement convention: integration
//! tests that need a full client/server round trip live under `tests/`,
//! separate from the inline unit tests in `src/`.

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use freenet_client::{Client, ClientConfig};

/// Reads the 4-byte handshake magic a client sends immediately on connect,
/// without going through `FcpConnection` (which would write its own magic
/// back out, which a node never does).
async fn read_handshake_magic(stream: &mut TcpStream) {
    let mut magic = [0u8; 4];
    stream.read_exact(&mut magic).await.unwrap();
    assert_eq!(magic, [0x00, 0x00, 0x00, 0x02]);
}

async fn read_line(reader: &mut BufReader<tokio::net::tcp::OwnedReadHalf>) -> String {
    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    line
}

async fn write_line(writer: &mut tokio::net::tcp::OwnedWriteHalf, line: &str) {
    writer.write_all(line.as_bytes()).await.unwrap();
    writer.write_all(b"\n").await.unwrap();
    writer.flush().await.unwrap();
}

#[tokio::test]
async fn handshake_reports_node_capabilities() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let node = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        read_handshake_magic(&mut stream).await;
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        assert_eq!(read_line(&mut reader).await, "ClientHello");
        assert_eq!(read_line(&mut reader).await, "EndMessage");

        write_line(&mut write_half, "NodeHello").await;
        write_line(&mut write_half, "MaxFileSize=40000000").await;
        write_line(&mut write_half, "Node=FCPv2,0.7.1").await;
        write_line(&mut write_half, "Protocol=1.2").await;
        write_line(&mut write_half, "EndMessage").await;
    });

    let client = Client::new(ClientConfig::new(&addr.ip().to_string(), addr.port()));
    let info = client.handshake().await.unwrap();

    assert_eq!(info.max_file_size, 0x40000000);
    assert_eq!(info.node_type, "FCPv2");
    assert_eq!(info.node_version, "0.7.1");
    assert_eq!(info.protocol, "1.2");

    node.await.unwrap();
}

#[tokio::test]
async fn estimated_load_parses_clientinfo_response() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let node = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        read_handshake_magic(&mut stream).await;
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        assert_eq!(read_line(&mut reader).await, "ClientInfo");
        assert_eq!(read_line(&mut reader).await, "EndMessage");

        write_line(&mut write_half, "EstimatedLoad=2a").await;
        write_line(&mut write_half, "EndMessage").await;
    });

    let client = Client::new(ClientConfig::new(&addr.ip().to_string(), addr.port()));
    let load = client.estimated_load().await.unwrap();
    assert_eq!(load, 0x2a);

    node.await.unwrap();
}

#[tokio::test]
async fn get_raw_recovers_from_a_restart_mid_metadata_chunk() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let meta = b"meta-bytes".to_vec();
    let data = b"payload-data".to_vec();
    let meta_len = meta.len();
    let data_len_field = data.len() + meta_len;

    let node = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        read_handshake_magic(&mut stream).await;
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        assert_eq!(read_line(&mut reader).await, "ClientGet");
        let uri_line = read_line(&mut reader).await;
        assert!(uri_line.starts_with("URI="));
        let htl_line = read_line(&mut reader).await;
        assert!(htl_line.starts_with("HopsToLive="));
        assert_eq!(read_line(&mut reader).await, "EndMessage");

        // First attempt: announce the key, then get interrupted before any
        // DataChunk goes out.
        write_line(&mut write_half, "DataFound").await;
        write_line(&mut write_half, &format!("DataLength={data_len_field:x}")).await;
        write_line(&mut write_half, &format!("MetadataLength={meta_len:x}")).await;
        write_line(&mut write_half, "EndMessage").await;
        write_line(&mut write_half, "Restarted").await;

        // Second attempt on the same connection: the client doesn't resend
        // ClientGet, it just goes back to waiting for a response line.
        write_line(&mut write_half, "DataFound").await;
        write_line(&mut write_half, &format!("DataLength={data_len_field:x}")).await;
        write_line(&mut write_half, &format!("MetadataLength={meta_len:x}")).await;
        write_line(&mut write_half, "EndMessage").await;

        write_line(&mut write_half, "DataChunk").await;
        write_line(&mut write_half, &format!("Length={:x}", meta.len())).await;
        write_line(&mut write_half, "Data").await;
        write_half.write_all(&meta).await.unwrap();
        write_half.flush().await.unwrap();

        write_line(&mut write_half, "DataChunk").await;
        write_line(&mut write_half, &format!("Length={:x}", data.len())).await;
        write_line(&mut write_half, "Data").await;
        write_half.write_all(&data).await.unwrap();
        write_half.flush().await.unwrap();
    });

    let config = ClientConfig::new(&addr.ip().to_string(), addr.port());
    let (got_data, got_meta) = freenet_client::raw::get_raw_bytes(&config, &fcp_uri::Uri::chk_template(), 5, 1)
        .await
        .unwrap();

    assert_eq!(got_data, data);
    assert_eq!(got_meta, meta);

    node.await.unwrap();
}

#[tokio::test]
async fn fec_insert_surfaces_a_node_reported_failed_as_a_fec_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let node = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        read_handshake_magic(&mut stream).await;
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        assert_eq!(read_line(&mut reader).await, "FECSegmentFile");
        let algo_line = read_line(&mut reader).await;
        assert!(algo_line.starts_with("AlgoName="));
        let len_line = read_line(&mut reader).await;
        assert!(len_line.starts_with("FileLength="));
        assert_eq!(read_line(&mut reader).await, "EndMessage");

        write_line(&mut write_half, "Failed").await;
        write_line(&mut write_half, "Reason=unsupported FEC algorithm").await;
        write_line(&mut write_half, "EndMessage").await;
    });

    let config = ClientConfig::new(&addr.ip().to_string(), addr.port());
    let err = freenet_client::fec::insert(&config, b"some file contents", &fcp_uri::Uri::chk_template(), 5, None, None)
        .await
        .unwrap_err();

    match err {
        freenet_client::Error::Fec(reason) => assert_eq!(reason, "unsupported FEC algorithm"),
        other => panic!("expected Error::Fec, got {other:?}"),
    }

    node.await.unwrap();
}

#[tokio::test]
async fn get_raw_with_no_explicit_numtries_retries_up_to_configs_max_tries() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let data = b"second-attempt-data".to_vec();

    let node = tokio::spawn(async move {
        // First connection: node reports the key isn't found yet.
        let (mut stream, _) = listener.accept().await.unwrap();
        read_handshake_magic(&mut stream).await;
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        assert_eq!(read_line(&mut reader).await, "ClientGet");
        read_line(&mut reader).await;
        read_line(&mut reader).await;
        assert_eq!(read_line(&mut reader).await, "EndMessage");
        write_line(&mut write_half, "DataNotFound").await;

        // Second connection: the client's retry opens a fresh session and
        // this time the node has the data.
        let (mut stream, _) = listener.accept().await.unwrap();
        read_handshake_magic(&mut stream).await;
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        assert_eq!(read_line(&mut reader).await, "ClientGet");
        read_line(&mut reader).await;
        read_line(&mut reader).await;
        assert_eq!(read_line(&mut reader).await, "EndMessage");

        write_line(&mut write_half, "DataFound").await;
        write_line(&mut write_half, &format!("DataLength={:x}", data.len())).await;
        write_line(&mut write_half, "MetadataLength=0").await;
        write_line(&mut write_half, "EndMessage").await;
        write_line(&mut write_half, "DataChunk").await;
        write_line(&mut write_half, &format!("Length={:x}", data.len())).await;
        write_line(&mut write_half, "Data").await;
        write_half.write_all(&data).await.unwrap();
        write_half.flush().await.unwrap();
    });

    let config = ClientConfig::new(&addr.ip().to_string(), addr.port()).with_max_tries(2);
    let client = Client::new(config);
    let key = client
        .get_raw(&fcp_uri::Uri::chk_template(), 5, None)
        .await
        .unwrap();

    assert_eq!(key.data, data);

    node.await.unwrap();
}
