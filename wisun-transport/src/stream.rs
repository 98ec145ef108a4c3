//! Stream accessor trait for the transport layer

use async_trait::async_trait;
use std::time::Duration;
use wisun_core::{WisunError, WisunResult};

/// Byte-stream interface to the physical link with the adapter.
///
/// The session layer is written against this trait so it can be exercised
/// with a scripted stream in tests.
#[async_trait]
pub trait StreamAccessor: Send + Sync {
    /// Set the read timeout. `None` means wait indefinitely.
    ///
    /// A read that exceeds the timeout fails with `WisunError::Timeout`;
    /// callers use this to interleave periodic work with reading.
    async fn set_timeout(&mut self, timeout: Option<Duration>) -> WisunResult<()>;

    /// Read available bytes into `buf`. Returns the number of bytes read,
    /// or 0 at end of stream.
    async fn read(&mut self, buf: &mut [u8]) -> WisunResult<usize>;

    /// Write bytes to the stream. Returns the number of bytes written.
    async fn write(&mut self, buf: &[u8]) -> WisunResult<usize>;

    /// Write the whole buffer.
    async fn write_all(&mut self, buf: &[u8]) -> WisunResult<()> {
        let mut written = 0;
        while written < buf.len() {
            let n = self.write(&buf[written..]).await?;
            if n == 0 {
                return Err(WisunError::Connection(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "Failed to write all data",
                )));
            }
            written += n;
        }
        Ok(())
    }

    /// Flush any buffered data.
    async fn flush(&mut self) -> WisunResult<()>;

    /// Whether the stream is closed.
    fn is_closed(&self) -> bool;

    /// Close the stream.
    async fn close(&mut self) -> WisunResult<()>;
}

/// Transport layer: a stream that must be opened before use.
#[async_trait]
pub trait TransportLayer: StreamAccessor {
    /// Open the physical connection.
    async fn open(&mut self) -> WisunResult<()>;
}
