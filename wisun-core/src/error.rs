use std::fmt;
use thiserror::Error;

/// Cause of an adapter `FAIL ERnn` reply.
///
/// The adapter answers a rejected command with `FAIL` and a two-digit reason
/// code; the code selects one of a small fixed set of causes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// ER04 - the command is not supported
    UnsupportedCommand,
    /// ER05 - wrong number of arguments
    ArgumentCount,
    /// ER06 - argument format or value out of range
    ArgumentValue,
    /// ER09 - UART input error
    UartInput,
    /// ER10 - the command was accepted but its execution failed
    CommandFailed,
    /// ER01-ER03, ER07, ER08 - reserved codes
    Reserved(u8),
    /// A code outside the documented table
    Unknown(u8),
}

impl FailureReason {
    /// Map a numeric reason code to its cause.
    pub fn from_code(code: u8) -> Self {
        match code {
            4 => FailureReason::UnsupportedCommand,
            5 => FailureReason::ArgumentCount,
            6 => FailureReason::ArgumentValue,
            9 => FailureReason::UartInput,
            10 => FailureReason::CommandFailed,
            1..=3 | 7 | 8 => FailureReason::Reserved(code),
            _ => FailureReason::Unknown(code),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::UnsupportedCommand => write!(f, "ER04 command not supported"),
            FailureReason::ArgumentCount => write!(f, "ER05 wrong argument count"),
            FailureReason::ArgumentValue => write!(f, "ER06 bad argument format or value"),
            FailureReason::UartInput => write!(f, "ER09 UART input error"),
            FailureReason::CommandFailed => write!(f, "ER10 command accepted but failed"),
            FailureReason::Reserved(code) => write!(f, "ER{:02} reserved", code),
            FailureReason::Unknown(code) => write!(f, "ER{:02} unknown", code),
        }
    }
}

/// Main error type for Wi-SUN B-route operations
///
/// None of these conditions terminate the process; they are surfaced to the
/// caller, which decides whether to abort, reconnect, or continue.
#[derive(Error, Debug)]
pub enum WisunError {
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Timeout")]
    Timeout,

    #[error("Transport write failed: {0}")]
    TransportWrite(#[source] std::io::Error),

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Unexpected acknowledgment in state {0}")]
    UnexpectedAck(String),

    #[error("Adapter failure: {0}")]
    AdapterFailure(FailureReason),

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Unknown property 0x{epc:02X} on {object}")]
    UnknownProperty { object: String, epc: u8 },

    #[error("No coordinator address resolved yet")]
    NotJoined,

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type alias for Wi-SUN B-route operations
pub type WisunResult<T> = Result<T, WisunError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_reason_from_code() {
        assert_eq!(FailureReason::from_code(4), FailureReason::UnsupportedCommand);
        assert_eq!(FailureReason::from_code(5), FailureReason::ArgumentCount);
        assert_eq!(FailureReason::from_code(6), FailureReason::ArgumentValue);
        assert_eq!(FailureReason::from_code(9), FailureReason::UartInput);
        assert_eq!(FailureReason::from_code(10), FailureReason::CommandFailed);
        assert_eq!(FailureReason::from_code(7), FailureReason::Reserved(7));
        assert_eq!(FailureReason::from_code(42), FailureReason::Unknown(42));
    }

    #[test]
    fn test_failure_reason_display() {
        assert_eq!(
            format!("{}", FailureReason::UnsupportedCommand),
            "ER04 command not supported"
        );
        assert_eq!(format!("{}", FailureReason::Reserved(2)), "ER02 reserved");
    }
}
