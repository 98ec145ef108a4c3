//! Wi-SUN B-route smart meter communication stack
//!
//! This library drives a Wi-SUN communication adapter through its
//! line-oriented command protocol and exchanges ECHONET Lite frames with a
//! low-voltage smart electric energy meter over the joined link.
//!
//! # Architecture
//!
//! The workspace is organized as one crate per concern:
//!
//! - `wisun-core`: error taxonomy and shared helpers
//! - `wisun-echonet`: ECHONET Lite frame codec and property semantics
//! - `wisun-transport`: serial transport and CRLF line framing
//! - `wisun-session`: adapter command/response/event state machine
//! - `wisun-client`: meter polling client with reading conversion
//!
//! # Usage
//!
//! ```no_run
//! use wisun::client::{ClientConfig, MeterReader};
//! use wisun::transport::{SerialSettings, SerialTransport};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_env()?;
//! let transport = SerialTransport::new(SerialSettings::new(&config.serial_port));
//! let mut reader = MeterReader::new(transport, &config);
//! reader.run().await?;
//! # Ok(())
//! # }
//! ```

// Re-export core types
pub use wisun_core::{FailureReason, WisunError, WisunResult};
pub use wisun_echonet::{EchonetObject, Frame, Property};

// Re-export the frame codec
pub mod echonet {
    pub use wisun_echonet::*;
}

// Re-export the transport layer
pub mod transport {
    pub use wisun_transport::*;
}

// Re-export the session layer
pub mod session {
    pub use wisun_session::*;
}

// Re-export the client API
pub mod client {
    pub use wisun_client::*;
}
