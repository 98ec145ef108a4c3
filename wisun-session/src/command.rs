//! Adapter command encoding

use std::fmt;
use wisun_core::hex;

/// Active scan mode: scan with information elements.
pub const SCAN_MODE_ACTIVE: u8 = 2;
/// Channel bitmap selecting every channel.
pub const SCAN_CHANNEL_MASK: &str = "FFFFFFFF";
/// UDP handle used for outbound application traffic.
pub const SEND_HANDLE: u8 = 1;
/// ECHONET Lite UDP port.
pub const ECHONET_PORT: u16 = 0x0E1A;
/// PANA UDP port.
pub const PANA_PORT: u16 = 0x02CC;

/// Virtual registers written through the register command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    /// SFE - command echo-back control.
    EchoBack,
    /// S2 - logical channel number.
    Channel,
    /// S3 - PAN id.
    PanId,
}

impl Register {
    /// Register name on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Register::EchoBack => "SFE",
            Register::Channel => "S2",
            Register::PanId => "S3",
        }
    }
}

/// One outbound command for the adapter.
///
/// Only the subset needed for join and data transfer is modeled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// SKSREG - write a virtual register.
    SetRegister { register: Register, value: String },
    /// SKVER - query the firmware version.
    Version,
    /// SKSETPWD - register the Route-B password.
    SetPassword { password: String },
    /// SKSETRBID - register the Route-B authentication id.
    SetRouteBId { id: String },
    /// SKSCAN - run an active scan over every channel.
    ActiveScan { duration: u8 },
    /// SKLL64 - derive the link-local address for a MAC address.
    ResolveAddress { mac: String },
    /// SKJOIN - start the secure join toward a coordinator address.
    Join { address: String },
    /// SKSENDTO - send a UDP datagram with a binary payload.
    SendTo { address: String, payload: Vec<u8> },
}

impl Command {
    /// Leading token of the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetRegister { .. } => "SKSREG",
            Command::Version => "SKVER",
            Command::SetPassword { .. } => "SKSETPWD",
            Command::SetRouteBId { .. } => "SKSETRBID",
            Command::ActiveScan { .. } => "SKSCAN",
            Command::ResolveAddress { .. } => "SKLL64",
            Command::Join { .. } => "SKJOIN",
            Command::SendTo { .. } => "SKSENDTO",
        }
    }

    /// Encode the command into the bytes written to the transport.
    ///
    /// Every command is an ASCII line terminated with CRLF. The data
    /// transfer command instead appends the raw payload directly after the
    /// length field, with no delimiter after the payload.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Command::SetRegister { register, value } => {
                format!("SKSREG {} {}\r\n", register.code(), value).into_bytes()
            }
            Command::Version => b"SKVER\r\n".to_vec(),
            Command::SetPassword { password } => {
                format!("SKSETPWD {:X} {}\r\n", password.len(), password).into_bytes()
            }
            Command::SetRouteBId { id } => format!("SKSETRBID {}\r\n", id).into_bytes(),
            Command::ActiveScan { duration } => format!(
                "SKSCAN {} {} {}\r\n",
                SCAN_MODE_ACTIVE, SCAN_CHANNEL_MASK, duration
            )
            .into_bytes(),
            Command::ResolveAddress { mac } => format!("SKLL64 {}\r\n", mac).into_bytes(),
            Command::Join { address } => format!("SKJOIN {}\r\n", address).into_bytes(),
            Command::SendTo { address, payload } => {
                let mut data = format!(
                    "SKSENDTO {} {} {:04X} 1 {:04X} ",
                    SEND_HANDLE,
                    address,
                    ECHONET_PORT,
                    payload.len()
                )
                .into_bytes();
                data.extend_from_slice(payload);
                data
            }
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SendTo { address, payload } => write!(
                f,
                "SKSENDTO {} {} {:04X} 1 {:04X} {}",
                SEND_HANDLE,
                address,
                ECHONET_PORT,
                payload.len(),
                hex::encode_upper(payload)
            ),
            other => {
                let encoded = other.encode();
                f.write_str(String::from_utf8_lossy(&encoded).trim_end())
            }
        }
    }
}
