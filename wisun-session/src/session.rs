//! Adapter session: command sequencing, event interpretation and data
//! transfer
//!
//! One `AdapterSession` owns the transport and every piece of negotiation
//! state. Inbound lines are processed to completion, one at a time, in the
//! order the transport delivered them; the adapter never has two outstanding
//! requests from this client, so no queueing or locking is involved.

use crate::command::{Command, Register, ECHONET_PORT, PANA_PORT};
use crate::line::{classify, AdapterLine, EventCode, RxUdp};
use crate::pan::PanDescriptor;
use crate::state::SessionState;
use std::time::Duration;
use wisun_core::{WisunError, WisunResult};
use wisun_echonet::{EchonetObject, Frame};
use wisun_transport::{LineReader, StreamAccessor, TransportLayer};

/// Default scan duration argument for the scan command. The adapter's scan
/// timeout is `0.0096 * (2^n + 1)` seconds per channel; 6 is a practical
/// middle ground.
pub const DEFAULT_SCAN_DURATION: u8 = 6;

/// Route-B credentials and scan tuning for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Route-B authentication id.
    pub route_b_id: String,
    /// Route-B password.
    pub route_b_password: String,
    /// Scan duration argument passed with every scan command. This is the
    /// adapter-side timeout; the session itself never times a scan.
    pub scan_duration: u8,
}

impl SessionConfig {
    pub fn new(route_b_id: impl Into<String>, route_b_password: impl Into<String>) -> Self {
        Self {
            route_b_id: route_b_id.into(),
            route_b_password: route_b_password.into(),
            scan_duration: DEFAULT_SCAN_DURATION,
        }
    }
}

/// High-level signal emitted to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionSignal {
    /// The secure link is up; application frames can be exchanged.
    Joined,
    /// A decoded application frame arrived.
    FrameReceived(Frame),
}

/// Outcome of dispatching one inbound line.
///
/// A report is a diagnostic, not a failure: the session has already moved
/// past the line and remains usable.
#[derive(Debug, Default)]
pub struct Dispatch {
    pub signal: Option<SessionSignal>,
    pub report: Option<WisunError>,
}

/// One reducer step: at most one transition, one outbound command and one
/// signal.
#[derive(Debug, Default)]
struct Step {
    transition: Option<SessionState>,
    command: Option<Command>,
    signal: Option<SessionSignal>,
    report: Option<WisunError>,
}

impl Step {
    fn none() -> Self {
        Self::default()
    }

    fn transition(next: SessionState) -> Self {
        Step {
            transition: Some(next),
            ..Default::default()
        }
    }

    fn issue(command: Command) -> Self {
        Step {
            command: Some(command),
            ..Default::default()
        }
    }

    fn report(error: WisunError) -> Self {
        Step {
            report: Some(error),
            ..Default::default()
        }
    }
}

/// Session state for one Wi-SUN adapter.
pub struct AdapterSession<T: TransportLayer> {
    transport: T,
    reader: LineReader,
    config: SessionConfig,
    state: SessionState,
    pan: PanDescriptor,
    coordinator: Option<String>,
    channel_registered: bool,
    joined: bool,
    firmware_version: Option<String>,
}

impl<T: TransportLayer> AdapterSession<T> {
    pub fn new(transport: T, config: SessionConfig) -> Self {
        Self {
            transport,
            reader: LineReader::new(),
            config,
            state: SessionState::Idle,
            pan: PanDescriptor::new(),
            coordinator: None,
            channel_registered: false,
            joined: false,
            firmware_version: None,
        }
    }

    /// Current position in the handshake.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The secure session has been established.
    pub fn is_joined(&self) -> bool {
        self.joined
    }

    /// Resolved coordinator address, once the handshake reaches it.
    pub fn coordinator(&self) -> Option<&str> {
        self.coordinator.as_deref()
    }

    /// Firmware version reported by the adapter, if seen.
    pub fn firmware_version(&self) -> Option<&str> {
        self.firmware_version.as_deref()
    }

    /// Scan attributes captured for the join target.
    pub fn pan(&self) -> &PanDescriptor {
        &self.pan
    }

    /// Configure how long `poll_line` waits before yielding with no line.
    pub async fn set_poll_interval(&mut self, interval: Duration) -> WisunResult<()> {
        self.transport.set_timeout(Some(interval)).await
    }

    /// Open the transport (if needed) and begin the handshake with echo
    /// suppression. Any previous negotiation state is discarded.
    pub async fn start(&mut self) -> WisunResult<()> {
        if self.transport.is_closed() {
            self.transport.open().await?;
        }
        self.state = SessionState::Idle;
        self.pan.clear();
        self.coordinator = None;
        self.channel_registered = false;
        self.joined = false;
        self.send_command(Command::SetRegister {
            register: Register::EchoBack,
            value: "0".to_string(),
        })
        .await
    }

    /// Write one command and advance the last-issued-command marker.
    ///
    /// The marker only advances after the write succeeds; a failed write is
    /// reported as `TransportWrite` and leaves the state unchanged.
    pub async fn send_command(&mut self, command: Command) -> WisunResult<()> {
        self.write_command(&command).await?;
        self.state = command_marker(&command);
        Ok(())
    }

    /// Send an application frame to the coordinator.
    ///
    /// Valid only once the coordinator address is resolved; rejected with
    /// `NotJoined` before that, without touching the transport. Issued from
    /// the joined idle state this enters the transmission-pending state.
    pub async fn send_frame(&mut self, frame: &Frame) -> WisunResult<()> {
        let address = self.coordinator.clone().ok_or(WisunError::NotJoined)?;
        let command = Command::SendTo {
            address,
            payload: frame.encode(),
        };
        self.write_command(&command).await?;
        if self.state == SessionState::Joined {
            self.state = SessionState::Sending;
        }
        Ok(())
    }

    /// Read the next inbound line, or `None` if the poll interval elapses
    /// first.
    pub async fn poll_line(&mut self) -> WisunResult<Option<Vec<u8>>> {
        self.reader.poll_line(&mut self.transport).await
    }

    /// Consume one inbound line to completion.
    ///
    /// Performs at most one state transition plus at most one outbound
    /// action; any command a transition calls for has been written by the
    /// time this returns. Command echoes are ignored, so re-dispatching an
    /// echo is a no-op. A hard `Err` is returned only for transport
    /// failures; everything else the line can provoke arrives as a report.
    pub async fn dispatch(&mut self, line: &[u8]) -> WisunResult<Dispatch> {
        if line.is_empty() {
            return Ok(Dispatch::default());
        }
        let parsed = match classify(line) {
            Ok(parsed) => parsed,
            Err(report) => {
                log::warn!("{}", report);
                return Ok(Dispatch {
                    signal: None,
                    report: Some(report),
                });
            }
        };

        let step = self.apply(parsed);
        if let Some(command) = step.command {
            self.send_command(command).await?;
        } else if let Some(next) = step.transition {
            if next != self.state {
                log::debug!("state {} -> {}", self.state, next);
            }
            self.state = next;
        }
        if let Some(report) = &step.report {
            log::warn!("{}", report);
        }
        Ok(Dispatch {
            signal: step.signal,
            report: step.report,
        })
    }

    /// The transition function: (current state, classified line) to one
    /// step. No I/O happens here, which keeps the table testable on its
    /// own.
    fn apply(&mut self, line: AdapterLine) -> Step {
        match line {
            AdapterLine::Echo(_) => Step::none(),
            AdapterLine::Version(version) => {
                log::debug!("adapter firmware {}", version);
                self.firmware_version = Some(version);
                Step::none()
            }
            AdapterLine::PanDescription => {
                if self.state.is_scanning() {
                    Step::transition(SessionState::ScanDescribed)
                } else {
                    Step::report(WisunError::ProtocolViolation(format!(
                        "PAN description outside a scan (state {})",
                        self.state
                    )))
                }
            }
            AdapterLine::Event { code, raw_code } => self.apply_event(code, raw_code),
            AdapterLine::RxUdp(rx) => self.apply_rxudp(rx),
            AdapterLine::Ok => self.apply_ack(),
            AdapterLine::Fail(reason) => Step::report(WisunError::AdapterFailure(reason)),
            AdapterLine::Other(raw) => self.apply_other(&raw),
        }
    }

    fn apply_event(&mut self, code: EventCode, raw_code: u8) -> Step {
        match code {
            EventCode::ActiveScanCompleted if self.state.is_scanning() => {
                let target = if self.pan.is_complete() {
                    self.pan.coordinator_mac().map(str::to_string)
                } else {
                    None
                };
                match target {
                    Some(mac) => Step::issue(Command::ResolveAddress { mac }),
                    None => {
                        // No candidate PAN: repeat the scan with unchanged
                        // mode and mask until the adapter finds one. The
                        // scan duration argument is the only bound.
                        log::info!("scan found no PAN, scanning again");
                        self.pan.clear();
                        Step::issue(Command::ActiveScan {
                            duration: self.config.scan_duration,
                        })
                    }
                }
            }
            EventCode::JoinCompleted => {
                log::info!("secure session established");
                self.joined = true;
                Step {
                    transition: Some(SessionState::Joined),
                    signal: Some(SessionSignal::Joined),
                    ..Default::default()
                }
            }
            EventCode::JoinFailed
            | EventCode::SessionCloseTimedOut
            | EventCode::SessionExpired
            | EventCode::TransmissionLimited => {
                log::warn!("EVENT {:02X}: {}", raw_code, code.description());
                Step::none()
            }
            other => {
                log::info!("EVENT {:02X}: {}", raw_code, other.description());
                Step::none()
            }
        }
    }

    fn apply_ack(&mut self) -> Step {
        match self.state {
            SessionState::EchoSuppressed => Step::issue(Command::Version),
            SessionState::VersionChecked => Step::issue(Command::SetPassword {
                password: self.config.route_b_password.clone(),
            }),
            SessionState::PasswordSet => Step::issue(Command::SetRouteBId {
                id: self.config.route_b_id.clone(),
            }),
            SessionState::IdSet => {
                self.pan.clear();
                Step::issue(Command::ActiveScan {
                    duration: self.config.scan_duration,
                })
            }
            // The scan, join and data-transfer acknowledgments carry no next
            // step; the interesting part arrives as an event later.
            SessionState::Scanning | SessionState::Joining | SessionState::Sending => Step::none(),
            SessionState::ChannelRegistered => {
                self.channel_registered = true;
                if self.coordinator.is_none() {
                    self.resolve_step()
                } else {
                    match self.pan.pan_id() {
                        Some(pan_id) => Step::issue(Command::SetRegister {
                            register: Register::PanId,
                            value: pan_id.to_string(),
                        }),
                        None => Step::report(WisunError::ProtocolViolation(
                            "PAN id was never captured during the scan".to_string(),
                        )),
                    }
                }
            }
            SessionState::PanRegistered => match &self.coordinator {
                Some(address) => Step::issue(Command::Join {
                    address: address.clone(),
                }),
                None => self.resolve_step(),
            },
            state => Step::report(WisunError::UnexpectedAck(state.as_str().to_string())),
        }
    }

    /// Request link-local resolution of the scanned coordinator MAC.
    fn resolve_step(&self) -> Step {
        match self.pan.coordinator_mac() {
            Some(mac) => Step::issue(Command::ResolveAddress {
                mac: mac.to_string(),
            }),
            None => Step::report(WisunError::ProtocolViolation(
                "Coordinator address was never captured during the scan".to_string(),
            )),
        }
    }

    fn apply_rxudp(&mut self, rx: RxUdp) -> Step {
        match rx.remote_port {
            ECHONET_PORT => {
                if rx.payload.len() != rx.declared_len {
                    return Step::report(WisunError::MalformedFrame(format!(
                        "Notification declares {} payload bytes, {} delivered",
                        rx.declared_len,
                        rx.payload.len()
                    )));
                }
                match Frame::decode(&rx.payload) {
                    Ok(frame) => {
                        // A frame from the meter means the pending exchange,
                        // if any, is answered. Best effort: the adapter has
                        // no correlation ids, so a spontaneous notification
                        // can be taken for the reply.
                        let transition = if frame.seoj() == EchonetObject::SMART_METER
                            && self.state == SessionState::Sending
                        {
                            Some(SessionState::Joined)
                        } else {
                            None
                        };
                        Step {
                            transition,
                            signal: Some(SessionSignal::FrameReceived(frame)),
                            ..Default::default()
                        }
                    }
                    Err(report) => Step::report(report),
                }
            }
            PANA_PORT => {
                log::debug!("PANA datagram from {}", rx.sender);
                Step::none()
            }
            port => {
                log::warn!("datagram from unexpected port 0x{:04X} dropped", port);
                Step::none()
            }
        }
    }

    fn apply_other(&mut self, raw: &[u8]) -> Step {
        match self.state {
            SessionState::ScanDescribed => {
                let text = String::from_utf8_lossy(raw);
                if self.pan.insert_line(&text) {
                    Step::none()
                } else {
                    Step::report(WisunError::ProtocolViolation(format!(
                        "Unparsable scan attribute: {}",
                        text.trim()
                    )))
                }
            }
            SessionState::AddressResolving => {
                let text = String::from_utf8_lossy(raw);
                let address = text.split_whitespace().next().unwrap_or("").to_string();
                if address.is_empty() {
                    return Step::report(WisunError::ProtocolViolation(
                        "Empty address resolution reply".to_string(),
                    ));
                }
                log::info!("coordinator address {}", address);
                self.coordinator = Some(address.clone());
                if self.channel_registered {
                    Step::issue(Command::Join { address })
                } else {
                    match self.pan.channel() {
                        Some(channel) => Step::issue(Command::SetRegister {
                            register: Register::Channel,
                            value: channel.to_string(),
                        }),
                        None => Step::report(WisunError::ProtocolViolation(
                            "Channel was never captured during the scan".to_string(),
                        )),
                    }
                }
            }
            state => Step::report(WisunError::ProtocolViolation(format!(
                "Unexpected line in state {}: {}",
                state,
                String::from_utf8_lossy(raw).trim()
            ))),
        }
    }
}

/// The state a successfully written command leaves the session in.
fn command_marker(command: &Command) -> SessionState {
    match command {
        Command::SetRegister {
            register: Register::EchoBack,
            ..
        } => SessionState::EchoSuppressed,
        Command::SetRegister {
            register: Register::Channel,
            ..
        } => SessionState::ChannelRegistered,
        Command::SetRegister {
            register: Register::PanId,
            ..
        } => SessionState::PanRegistered,
        Command::Version => SessionState::VersionChecked,
        Command::SetPassword { .. } => SessionState::PasswordSet,
        Command::SetRouteBId { .. } => SessionState::IdSet,
        Command::ActiveScan { .. } => SessionState::Scanning,
        Command::ResolveAddress { .. } => SessionState::AddressResolving,
        Command::Join { .. } => SessionState::Joining,
        Command::SendTo { .. } => SessionState::Sending,
    }
}

fn into_write_error(error: WisunError) -> WisunError {
    match error {
        WisunError::Connection(io) => WisunError::TransportWrite(io),
        other => other,
    }
}

impl<T: TransportLayer> AdapterSession<T> {
    async fn write_command(&mut self, command: &Command) -> WisunResult<()> {
        log::debug!("-> {}", command);
        let encoded = command.encode();
        if let Err(error) = self.transport.write_all(&encoded).await {
            return Err(into_write_error(error));
        }
        self.transport.flush().await.map_err(into_write_error)
    }
}
