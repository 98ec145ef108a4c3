//! Transport layer for the Wi-SUN adapter link
//!
//! This crate provides the byte-stream abstraction the session layer is
//! written against, a serial port implementation, and the CRLF line framing
//! used by the adapter's command protocol.

pub mod line;
pub mod serial;
pub mod stream;

pub use line::{LineReader, LINE_DELIMITER};
pub use serial::{SerialSettings, SerialTransport, ADAPTER_BAUD_RATE};
pub use stream::{StreamAccessor, TransportLayer};
pub use wisun_core::{WisunError, WisunResult};
