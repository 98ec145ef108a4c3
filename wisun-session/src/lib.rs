//! Adapter session layer
//!
//! This crate drives a Wi-SUN adapter through its line-oriented command
//! protocol: echo suppression, credential registration, channel scan,
//! address resolution, PAN registration and the secure join, then carries
//! ECHONET Lite frames over the adapter's data-transfer command.
//!
//! The session is a run-to-completion state machine: the caller feeds it one
//! inbound line at a time, and each line produces at most one state
//! transition, one outbound command and one caller-facing signal.

pub mod command;
pub mod line;
pub mod pan;
pub mod session;
pub mod state;

pub use command::{Command, Register, ECHONET_PORT, PANA_PORT};
pub use line::{classify, AdapterLine, EventCode, RxUdp};
pub use pan::PanDescriptor;
pub use session::{
    AdapterSession, Dispatch, SessionConfig, SessionSignal, DEFAULT_SCAN_DURATION,
};
pub use state::SessionState;
pub use wisun_core::{WisunError, WisunResult};
