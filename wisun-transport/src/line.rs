//! CRLF line framing over a byte stream

use crate::stream::StreamAccessor;
use bytes::{Buf, BytesMut};
use wisun_core::{WisunError, WisunResult};

/// Delimiter between adapter output lines.
pub const LINE_DELIMITER: &[u8] = b"\r\n";

/// Splits the adapter's output into CRLF-delimited lines.
///
/// Lines are returned without the delimiter, as raw byte vectors: the data
/// notification carries a binary payload inline, so a line is not
/// necessarily valid UTF-8.
#[derive(Debug, Default)]
pub struct LineReader {
    buffer: BytesMut,
}

impl LineReader {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(1024),
        }
    }

    /// Pop the next complete line out of the buffer, if one is present.
    fn take_line(&mut self) -> Option<Vec<u8>> {
        let pos = self
            .buffer
            .windows(LINE_DELIMITER.len())
            .position(|window| window == LINE_DELIMITER)?;
        let line = self.buffer.split_to(pos).to_vec();
        self.buffer.advance(LINE_DELIMITER.len());
        Some(line)
    }

    /// Read the next line from the stream.
    ///
    /// Returns `Ok(None)` when the stream's read timeout elapses before a
    /// full line arrives, so the caller can interleave periodic work. End of
    /// stream is a connection error: the adapter link never closes cleanly
    /// from the remote side.
    pub async fn poll_line<S: StreamAccessor + ?Sized>(
        &mut self,
        stream: &mut S,
    ) -> WisunResult<Option<Vec<u8>>> {
        loop {
            if let Some(line) = self.take_line() {
                return Ok(Some(line));
            }

            let mut chunk = [0u8; 256];
            let n = match stream.read(&mut chunk).await {
                Ok(n) => n,
                Err(WisunError::Timeout) => return Ok(None),
                Err(e) => return Err(e),
            };
            if n == 0 {
                return Err(WisunError::Connection(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "Stream closed by the adapter",
                )));
            }
            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }
}
