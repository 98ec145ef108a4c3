//! Inbound line classification
//!
//! The adapter's output is line-oriented: command echoes, generic
//! acknowledgments, failure replies, named events and one data notification
//! that carries a binary payload inline. Classification looks only at the
//! shape of the line; state-dependent lines (scan attributes, the address
//! resolution reply) stay raw and are interpreted by the session.

use wisun_core::{hex, FailureReason, WisunError, WisunResult};

/// Fields preceding the payload in an ERXUDP notification.
const RXUDP_HEADER_FIELDS: usize = 8;

/// Event sub-codes reported by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCode {
    /// 0x01 - neighbor solicitation received.
    NeighborSolicitation,
    /// 0x02 - neighbor advertisement received.
    NeighborAdvertisement,
    /// 0x05 - echo request received.
    EchoRequest,
    /// 0x1F - ED scan completed.
    EdScanCompleted,
    /// 0x20 - beacon received.
    BeaconReceived,
    /// 0x21 - UDP transmission completed.
    UdpSendCompleted,
    /// 0x22 - active scan completed.
    ActiveScanCompleted,
    /// 0x24 - secure join did not complete.
    JoinFailed,
    /// 0x25 - secure join completed.
    JoinCompleted,
    /// 0x26 - peer requested session termination.
    SessionCloseRequested,
    /// 0x27 - session closed.
    SessionClosed,
    /// 0x28 - session close request timed out.
    SessionCloseTimedOut,
    /// 0x29 - session lifetime expired.
    SessionExpired,
    /// 0x32 - total transmission time limit engaged.
    TransmissionLimited,
    /// 0x33 - total transmission time limit lifted.
    TransmissionResumed,
    /// A code outside the documented table.
    Unknown(u8),
}

impl EventCode {
    /// Map an event sub-code byte.
    pub fn from_code(code: u8) -> Self {
        match code {
            0x01 => EventCode::NeighborSolicitation,
            0x02 => EventCode::NeighborAdvertisement,
            0x05 => EventCode::EchoRequest,
            0x1F => EventCode::EdScanCompleted,
            0x20 => EventCode::BeaconReceived,
            0x21 => EventCode::UdpSendCompleted,
            0x22 => EventCode::ActiveScanCompleted,
            0x24 => EventCode::JoinFailed,
            0x25 => EventCode::JoinCompleted,
            0x26 => EventCode::SessionCloseRequested,
            0x27 => EventCode::SessionClosed,
            0x28 => EventCode::SessionCloseTimedOut,
            0x29 => EventCode::SessionExpired,
            0x32 => EventCode::TransmissionLimited,
            0x33 => EventCode::TransmissionResumed,
            _ => EventCode::Unknown(code),
        }
    }

    /// Short description used in logs.
    pub fn description(&self) -> &'static str {
        match self {
            EventCode::NeighborSolicitation => "neighbor solicitation received",
            EventCode::NeighborAdvertisement => "neighbor advertisement received",
            EventCode::EchoRequest => "echo request received",
            EventCode::EdScanCompleted => "ED scan completed",
            EventCode::BeaconReceived => "beacon received",
            EventCode::UdpSendCompleted => "UDP transmission completed",
            EventCode::ActiveScanCompleted => "active scan completed",
            EventCode::JoinFailed => "secure join did not complete",
            EventCode::JoinCompleted => "secure join completed",
            EventCode::SessionCloseRequested => "peer requested session termination",
            EventCode::SessionClosed => "session closed",
            EventCode::SessionCloseTimedOut => "session close request timed out",
            EventCode::SessionExpired => "session lifetime expired",
            EventCode::TransmissionLimited => "transmission time limit engaged",
            EventCode::TransmissionResumed => "transmission time limit lifted",
            EventCode::Unknown(_) => "unknown event",
        }
    }
}

/// A parsed ERXUDP data notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RxUdp {
    /// Sender address.
    pub sender: String,
    /// Destination address.
    pub dest: String,
    /// Sender's UDP port.
    pub remote_port: u16,
    /// Local UDP port.
    pub local_port: u16,
    /// Sender's link-layer address.
    pub sender_lla: String,
    /// Whether the datagram was received on the secured link.
    pub secured: bool,
    /// Payload length declared in the notification.
    pub declared_len: usize,
    /// Raw payload bytes as delivered.
    pub payload: Vec<u8>,
}

/// One classified inbound line.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterLine {
    /// Echo of a command we issued; the adapter repeats commands verbatim.
    Echo(String),
    /// EVER firmware version report.
    Version(String),
    /// EVENT with its sub-code.
    Event { code: EventCode, raw_code: u8 },
    /// Start of a PAN description block.
    PanDescription,
    /// Inbound UDP data notification.
    RxUdp(RxUdp),
    /// Generic acknowledgment.
    Ok,
    /// Failure reply with its reason.
    Fail(FailureReason),
    /// Anything else; meaning depends on the session state.
    Other(Vec<u8>),
}

/// Classify one raw line by its leading token.
pub fn classify(line: &[u8]) -> WisunResult<AdapterLine> {
    let token_end = line
        .iter()
        .position(|&b| b == b' ')
        .unwrap_or(line.len());
    let Ok(token) = std::str::from_utf8(&line[..token_end]) else {
        return Ok(AdapterLine::Other(line.to_vec()));
    };

    match token {
        "OK" => Ok(AdapterLine::Ok),
        "FAIL" => parse_fail(line, token_end),
        "EVENT" => parse_event(line, token_end),
        "EPANDESC" => Ok(AdapterLine::PanDescription),
        "EVER" => Ok(AdapterLine::Version(rest_of(line, token_end))),
        "ERXUDP" => parse_rxudp(line).map(AdapterLine::RxUdp),
        "SKSREG" | "SKVER" | "SKSETPWD" | "SKSETRBID" | "SKSCAN" | "SKLL64" | "SKJOIN"
        | "SKSENDTO" => Ok(AdapterLine::Echo(token.to_string())),
        _ => Ok(AdapterLine::Other(line.to_vec())),
    }
}

/// Text after the leading token, trimmed.
fn rest_of(line: &[u8], token_end: usize) -> String {
    String::from_utf8_lossy(&line[token_end.min(line.len())..])
        .trim()
        .to_string()
}

fn parse_fail(line: &[u8], token_end: usize) -> WisunResult<AdapterLine> {
    let argument = rest_of(line, token_end);
    let code = argument
        .strip_prefix("ER")
        .and_then(|digits| digits.parse::<u8>().ok())
        .ok_or_else(|| {
            WisunError::ProtocolViolation(format!("Unparsable failure reply: FAIL {}", argument))
        })?;
    Ok(AdapterLine::Fail(FailureReason::from_code(code)))
}

fn parse_event(line: &[u8], token_end: usize) -> WisunResult<AdapterLine> {
    let rest = rest_of(line, token_end);
    let code_token = rest.split_whitespace().next().ok_or_else(|| {
        WisunError::ProtocolViolation("EVENT line without a sub-code".to_string())
    })?;
    let raw_code = u8::from_str_radix(code_token, 16).map_err(|_| {
        WisunError::ProtocolViolation(format!("Invalid EVENT sub-code: {}", code_token))
    })?;
    Ok(AdapterLine::Event {
        code: EventCode::from_code(raw_code),
        raw_code,
    })
}

/// Parse an ERXUDP notification.
///
/// The payload may itself contain bytes that look like field separators or
/// line delimiters, so it is located by summing the lengths of the eight
/// preceding fields (plus one separator each), never by re-splitting the
/// whole line.
fn parse_rxudp(line: &[u8]) -> WisunResult<RxUdp> {
    let mut fields = Vec::with_capacity(RXUDP_HEADER_FIELDS);
    let mut pos = 0;
    for _ in 0..RXUDP_HEADER_FIELDS {
        let rest = &line[pos..];
        let end = rest.iter().position(|&b| b == b' ').ok_or_else(|| {
            WisunError::ProtocolViolation("Truncated ERXUDP notification".to_string())
        })?;
        let field = std::str::from_utf8(&rest[..end]).map_err(|_| {
            WisunError::ProtocolViolation("Non-ASCII field in ERXUDP notification".to_string())
        })?;
        fields.push(field.to_string());
        pos += end + 1;
    }
    let payload = line[pos..].to_vec();

    Ok(RxUdp {
        sender: fields[1].clone(),
        dest: fields[2].clone(),
        remote_port: hex::parse_u16(&fields[3])?,
        local_port: hex::parse_u16(&fields[4])?,
        sender_lla: fields[5].clone(),
        secured: fields[6] == "1",
        declared_len: hex::parse_u16(&fields[7])? as usize,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_basics() {
        assert_eq!(classify(b"OK").unwrap(), AdapterLine::Ok);
        assert_eq!(classify(b"EPANDESC").unwrap(), AdapterLine::PanDescription);
        assert_eq!(
            classify(b"SKVER").unwrap(),
            AdapterLine::Echo("SKVER".to_string())
        );
        assert_eq!(
            classify(b"EVER 1.2.8").unwrap(),
            AdapterLine::Version("1.2.8".to_string())
        );
        assert_eq!(
            classify(b"  Channel:21").unwrap(),
            AdapterLine::Other(b"  Channel:21".to_vec())
        );
    }

    #[test]
    fn test_classify_event() {
        match classify(b"EVENT 22 FE80:0000:0000:0000:021D:1290:1234:5678").unwrap() {
            AdapterLine::Event { code, raw_code } => {
                assert_eq!(code, EventCode::ActiveScanCompleted);
                assert_eq!(raw_code, 0x22);
            }
            other => panic!("unexpected line: {:?}", other),
        }
        match classify(b"EVENT 99 FE80::1").unwrap() {
            AdapterLine::Event { code, .. } => assert_eq!(code, EventCode::Unknown(0x99)),
            other => panic!("unexpected line: {:?}", other),
        }
        assert!(classify(b"EVENT").is_err());
    }

    #[test]
    fn test_classify_fail() {
        assert_eq!(
            classify(b"FAIL ER04").unwrap(),
            AdapterLine::Fail(FailureReason::UnsupportedCommand)
        );
        assert_eq!(
            classify(b"FAIL ER10").unwrap(),
            AdapterLine::Fail(FailureReason::CommandFailed)
        );
        assert!(classify(b"FAIL WHAT").is_err());
    }

    #[test]
    fn test_rxudp_payload_located_by_offset() {
        // Payload bytes include a space (0x20) and a CR (0x0D); naive
        // splitting would cut the payload short.
        let payload = [0x10u8, 0x81, 0x20, 0x0D];
        let mut line =
            b"ERXUDP FE80::1 FF02::1 0E1A 0E1A 001D129012345678 1 0004 ".to_vec();
        line.extend_from_slice(&payload);

        match classify(&line).unwrap() {
            AdapterLine::RxUdp(rx) => {
                assert_eq!(rx.sender, "FE80::1");
                assert_eq!(rx.remote_port, 0x0E1A);
                assert_eq!(rx.local_port, 0x0E1A);
                assert_eq!(rx.secured, true);
                assert_eq!(rx.declared_len, 4);
                assert_eq!(rx.payload, payload);
            }
            other => panic!("unexpected line: {:?}", other),
        }
    }

    #[test]
    fn test_rxudp_truncated_is_violation() {
        assert!(matches!(
            classify(b"ERXUDP FE80::1 FF02::1 0E1A"),
            Err(WisunError::ProtocolViolation(_))
        ));
    }

    #[test]
    fn test_event_code_table() {
        assert_eq!(EventCode::from_code(0x25), EventCode::JoinCompleted);
        assert_eq!(EventCode::from_code(0x24), EventCode::JoinFailed);
        assert_eq!(EventCode::from_code(0x21), EventCode::UdpSendCompleted);
        assert_eq!(EventCode::from_code(0x7F), EventCode::Unknown(0x7F));
    }
}
