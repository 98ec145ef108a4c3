use serde::{Deserialize, Serialize};
use std::fmt;

/// ECHONET Lite object identity (EOJ)
///
/// Three byte codes identify a logical device endpoint: the class group
/// code, the class code within the group, and the instance code. Equality is
/// structural over all three fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EchonetObject {
    class_group_code: u8,
    class_code: u8,
    instance_code: u8,
}

impl EchonetObject {
    /// The controller object this stack presents itself as.
    pub const CONTROLLER: EchonetObject = EchonetObject::new(0x05, 0xFF, 0x01);

    /// Low-voltage smart electric energy meter, first instance.
    ///
    /// Instance codes are assigned from 0x01 and a household has a single
    /// meter, so the first instance is assumed. The instance list
    /// notification can be used to confirm it.
    pub const SMART_METER: EchonetObject = EchonetObject::new(0x02, 0x88, 0x01);

    /// Node profile object, general node.
    pub const NODE_PROFILE: EchonetObject = EchonetObject::new(0x0E, 0xF0, 0x01);

    /// Create an object identity from its three codes.
    pub const fn new(class_group_code: u8, class_code: u8, instance_code: u8) -> Self {
        Self {
            class_group_code,
            class_code,
            instance_code,
        }
    }

    /// Build an identity from its wire representation.
    pub fn from_bytes(bytes: [u8; 3]) -> Self {
        Self::new(bytes[0], bytes[1], bytes[2])
    }

    /// Wire representation: group, class, instance.
    pub fn to_bytes(&self) -> [u8; 3] {
        [self.class_group_code, self.class_code, self.instance_code]
    }

    pub fn class_group_code(&self) -> u8 {
        self.class_group_code
    }

    pub fn class_code(&self) -> u8 {
        self.class_code
    }

    pub fn instance_code(&self) -> u8 {
        self.instance_code
    }

    /// Informational name of the class group, if it is a well-known one.
    fn class_group_name(&self) -> Option<&'static str> {
        match self.class_group_code {
            0x00 => Some("sensor devices"),
            0x01 => Some("air conditioning devices"),
            0x02 => Some("housing and facility devices"),
            0x03 => Some("cooking and household devices"),
            0x04 => Some("health devices"),
            0x05 => Some("management and operation devices"),
            0x06 => Some("audiovisual devices"),
            0x0E => Some("profile objects"),
            0x0F => Some("user-defined objects"),
            _ => None,
        }
    }

    /// Informational name of the class, if it is a well-known one.
    fn class_name(&self) -> Option<&'static str> {
        match (self.class_group_code, self.class_code) {
            (0x02, 0x88) => Some("low-voltage smart electric energy meter"),
            (0x05, 0xFF) => Some("controller"),
            (0x0E, 0xF0) => Some("node profile"),
            _ => None,
        }
    }
}

impl fmt::Display for EchonetObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.class_group_name() {
            Some(name) => write!(f, "{}", name)?,
            None => write!(f, "0x{:02X}", self.class_group_code)?,
        }
        match self.class_name() {
            Some(name) => write!(f, " / {}", name)?,
            None => write!(f, " / 0x{:02X}", self.class_code)?,
        }
        write!(f, " / 0x{:02X}", self.instance_code)
    }
}
