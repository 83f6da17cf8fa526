use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::error::TransportError;

/// Magic bytes an FCP client sends immediately after connecting, before any
/// message. Not part of any message frame.
pub const HANDSHAKE_MAGIC: [u8; 4] = [0x00, 0x00, 0x00, 0x02];

/// A line- and chunk-framed FCP connection over any async duplex stream.
///
/// Generic over the underlying stream so tests can drive it over an
/// in-memory duplex pipe instead of a real socket.
pub struct FcpConnection<S> {
    io: BufReader<S>,
    chunk_buf: Vec<u8>,
}

impl FcpConnection<TcpStream> {
    /// Connects to an FCP node at `addr` and sends the handshake magic.
    pub async fn connect(addr: impl tokio::net::ToSocketAddrs) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true).ok();
        Self::from_stream(stream).await
    }
}

impl<S> FcpConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an already-connected stream, sending the handshake magic bytes.
    pub async fn from_stream(mut stream: S) -> Result<Self, TransportError> {
        stream.write_all(&HANDSHAKE_MAGIC).await?;
        stream.flush().await?;
        Ok(FcpConnection {
            io: BufReader::new(stream),
            chunk_buf: Vec::new(),
        })
    }

    /// Sends one line of a message (without the trailing `\n`, which this
    /// appends).
    pub async fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        self.io.write_all(line.as_bytes()).await?;
        self.io.write_all(b"\n").await?;
        self.io.flush().await?;
        Ok(())
    }

    /// Sends a raw byte payload with no framing of its own (the caller is
    /// responsible for having sent a `Data`/`DataChunk` line first).
    pub async fn send_bytes(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.io.write_all(data).await?;
        self.io.flush().await?;
        Ok(())
    }

    /// Reads one line, with the trailing `\n` (and a preceding `\r`, if any)
    /// stripped.
    pub async fn recv_line(&mut self) -> Result<String, TransportError> {
        let mut buf = String::new();
        let n = tokio::io::AsyncBufReadExt::read_line(&mut self.io, &mut buf).await?;
        if n == 0 {
            return Err(TransportError::ConnectionClosed);
        }
        while buf.ends_with('\n') || buf.ends_with('\r') {
            buf.pop();
        }
        Ok(buf)
    }

    /// Reads a line and splits it on the first `=`, erroring if there isn't
    /// one.
    pub async fn recv_field(&mut self) -> Result<(String, String), TransportError> {
        let line = self.recv_line().await?;
        match line.split_once('=') {
            Some((k, v)) => Ok((k.to_string(), v.to_string())),
            None => Err(TransportError::MalformedField(line)),
        }
    }

    /// Reads exactly `len` raw bytes with no line framing.
    pub async fn recv_exact(&mut self, len: usize) -> Result<Vec<u8>, TransportError> {
        let mut buf = vec![0u8; len];
        self.io.read_exact(&mut buf).await?;
        Ok(buf)
    }

    /// Discards any cross-chunk buffer left over from an interrupted
    /// request. Callers reconnect (or re-issue a request on the `wait`
    /// state) after a `Restarted`, so the buffer from the abandoned request
    /// must not leak into the next one.
    pub fn reset_chunk_buffer(&mut self) {
        self.chunk_buf.clear();
    }

    pub(crate) fn chunk_buf_len(&self) -> usize {
        self.chunk_buf.len()
    }

    pub(crate) fn chunk_buf_extend(&mut self, chunk: Vec<u8>) {
        self.chunk_buf.extend(chunk);
    }

    pub(crate) fn chunk_buf_clear(&mut self) {
        self.chunk_buf.clear();
    }

    pub(crate) fn chunk_buf_take(&mut self, len: usize) -> Vec<u8> {
        self.chunk_buf.drain(..len).collect()
    }
}

/// Parses a hex-encoded field value, mapping failures to
/// [`TransportError::BadHexField`].
pub fn parse_hex_field(field: &'static str, value: &str) -> Result<u64, TransportError> {
    u64::from_str_radix(value, 16).map_err(|_| TransportError::BadHexField {
        field,
        value: value.to_string(),
    })
}
