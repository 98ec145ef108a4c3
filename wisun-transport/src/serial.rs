//! Serial port transport implementation

use crate::stream::{StreamAccessor, TransportLayer};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::SerialStream;
use wisun_core::{WisunError, WisunResult};

/// The adapter's fixed UART rate.
pub const ADAPTER_BAUD_RATE: u32 = 115_200;

/// Serial port settings for the adapter link.
#[derive(Debug, Clone)]
pub struct SerialSettings {
    pub port_name: String,
    pub baud_rate: u32,
    pub data_bits: tokio_serial::DataBits,
    pub stop_bits: tokio_serial::StopBits,
    pub parity: tokio_serial::Parity,
    pub flow_control: tokio_serial::FlowControl,
    pub timeout: Option<Duration>,
}

impl SerialSettings {
    /// Settings for the adapter's 8N1 link at its fixed rate.
    pub fn new(port_name: impl Into<String>) -> Self {
        Self::with_baud_rate(port_name, ADAPTER_BAUD_RATE)
    }

    /// Settings with an explicit baud rate.
    pub fn with_baud_rate(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            data_bits: tokio_serial::DataBits::Eight,
            stop_bits: tokio_serial::StopBits::One,
            parity: tokio_serial::Parity::None,
            flow_control: tokio_serial::FlowControl::None,
            timeout: None,
        }
    }
}

/// Serial port transport for the adapter.
pub struct SerialTransport {
    stream: Option<SerialStream>,
    settings: SerialSettings,
    closed: bool,
}

impl SerialTransport {
    pub fn new(settings: SerialSettings) -> Self {
        Self {
            stream: None,
            settings,
            closed: true,
        }
    }

    fn stream_mut(&mut self) -> WisunResult<&mut SerialStream> {
        self.stream.as_mut().ok_or_else(|| {
            WisunError::Connection(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "Serial port not open",
            ))
        })
    }
}

impl fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialTransport")
            .field("settings", &self.settings)
            .field("closed", &self.closed)
            .finish()
    }
}

#[async_trait]
impl TransportLayer for SerialTransport {
    async fn open(&mut self) -> WisunResult<()> {
        if !self.closed {
            return Err(WisunError::Connection(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Serial port already open",
            )));
        }

        let builder = tokio_serial::new(&self.settings.port_name, self.settings.baud_rate)
            .data_bits(self.settings.data_bits)
            .stop_bits(self.settings.stop_bits)
            .parity(self.settings.parity)
            .flow_control(self.settings.flow_control);

        let stream = SerialStream::open(&builder).map_err(|e| {
            WisunError::Connection(std::io::Error::other(format!(
                "Failed to open serial port {}: {}",
                self.settings.port_name, e
            )))
        })?;

        self.stream = Some(stream);
        self.closed = false;
        Ok(())
    }
}

#[async_trait]
impl StreamAccessor for SerialTransport {
    async fn set_timeout(&mut self, timeout: Option<Duration>) -> WisunResult<()> {
        self.settings.timeout = timeout;
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> WisunResult<usize> {
        let timeout = self.settings.timeout;
        let stream = self.stream_mut()?;

        let result = match timeout {
            Some(timeout) => tokio::time::timeout(timeout, stream.read(buf))
                .await
                .map_err(|_| WisunError::Timeout)?
                .map_err(WisunError::Connection),
            None => stream.read(buf).await.map_err(WisunError::Connection),
        };

        match result {
            Ok(0) => {
                self.closed = true;
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(e) => {
                self.closed = true;
                Err(e)
            }
        }
    }

    async fn write(&mut self, buf: &[u8]) -> WisunResult<usize> {
        let stream = self.stream_mut()?;
        stream.write(buf).await.map_err(WisunError::Connection)
    }

    async fn flush(&mut self) -> WisunResult<()> {
        let stream = self.stream_mut()?;
        stream.flush().await.map_err(WisunError::Connection)
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn close(&mut self) -> WisunResult<()> {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.flush().await;
        }
        self.closed = true;
        Ok(())
    }
}
