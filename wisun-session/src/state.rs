//! Session state machine states

use std::fmt;

/// Negotiation position of the adapter session.
///
/// The state doubles as the last-issued-command marker: the adapter's
/// generic `OK` acknowledgment carries no context of its own, so it is
/// interpreted against the state that issued the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Nothing sent yet.
    #[default]
    Idle,
    /// Echo suppression requested.
    EchoSuppressed,
    /// Firmware version queried.
    VersionChecked,
    /// Route-B password registered.
    PasswordSet,
    /// Route-B id registered.
    IdSet,
    /// Active scan in progress.
    Scanning,
    /// Inside a PAN description block.
    ScanDescribed,
    /// Link-local address resolution requested.
    AddressResolving,
    /// Channel register written.
    ChannelRegistered,
    /// PAN id register written.
    PanRegistered,
    /// Secure join in progress.
    Joining,
    /// Secure session established; idle between application exchanges.
    Joined,
    /// Application frame transmission in flight.
    Sending,
}

impl SessionState {
    /// Human-readable state name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::EchoSuppressed => "EchoSuppressed",
            SessionState::VersionChecked => "VersionChecked",
            SessionState::PasswordSet => "PasswordSet",
            SessionState::IdSet => "IdSet",
            SessionState::Scanning => "Scanning",
            SessionState::ScanDescribed => "ScanDescribed",
            SessionState::AddressResolving => "AddressResolving",
            SessionState::ChannelRegistered => "ChannelRegistered",
            SessionState::PanRegistered => "PanRegistered",
            SessionState::Joining => "Joining",
            SessionState::Joined => "Joined",
            SessionState::Sending => "Sending",
        }
    }

    /// States in which an active scan is running or being described.
    pub fn is_scanning(&self) -> bool {
        matches!(self, SessionState::Scanning | SessionState::ScanDescribed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
