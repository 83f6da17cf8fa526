use tokio::io::{AsyncRead, AsyncWrite};

use crate::connection::{parse_hex_field, FcpConnection};
use crate::error::TransportError;

impl<S> FcpConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Receives exactly `len` bytes of key data, transparently reassembling
    /// it from one or more `DataChunk`/`Length=`/`Data` frames.
    ///
    /// Chunk boundaries are dictated by the node and have no relationship
    /// to the metadata/data split or to any higher-level framing, so bytes
    /// left over from a previous call are carried in an internal buffer and
    /// consumed before any new chunk is read.
    ///
    /// Returns `Ok(None)` if a `Restarted` frame is seen before `len` bytes
    /// have been collected; any bytes buffered for the current request are
    /// discarded in that case.
    pub async fn recv_key_data(&mut self, len: usize) -> Result<Option<Vec<u8>>, TransportError> {
        while self.chunk_buf_len() < len {
            match self.recv_data_chunk().await? {
                Some(chunk) => self.chunk_buf_extend(chunk),
                None => {
                    self.chunk_buf_clear();
                    return Ok(None);
                }
            }
        }
        Ok(Some(self.chunk_buf_take(len)))
    }

    /// Sends `data` as a single `DataChunk` frame.
    pub async fn send_data_chunk(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.send_line("DataChunk").await?;
        self.send_line(&format!("Length={:x}", data.len())).await?;
        self.send_line("Data").await?;
        self.send_bytes(data).await
    }

    async fn recv_data_chunk(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let line = self.recv_line().await?;
        if line == "Restarted" {
            return Ok(None);
        }
        if line != "DataChunk" {
            return Err(TransportError::UnexpectedLine {
                expected: "DataChunk",
                got: line,
            });
        }

        let (field, value) = self.recv_field().await?;
        if field != "Length" {
            return Err(TransportError::UnexpectedLine {
                expected: "Length=",
                got: format!("{field}={value}"),
            });
        }
        let chunk_len = parse_hex_field("Length", &value)? as usize;

        let data_line = self.recv_line().await?;
        if data_line != "Data" {
            return Err(TransportError::UnexpectedLine {
                expected: "Data",
                got: data_line,
            });
        }

        Ok(Some(self.recv_exact(chunk_len).await?))
    }
}
