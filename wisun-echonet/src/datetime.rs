//! Timestamp carried by periodic cumulative energy measurements

use serde::{Deserialize, Serialize};
use std::fmt;
use wisun_core::{WisunError, WisunResult};

/// Date and time as recorded by the meter.
///
/// The meter reports it as seven bytes: a big-endian year followed by one
/// byte each for month, day, hour, minute and second. No timezone is
/// carried; the value is the meter's local clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementDateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl MeasurementDateTime {
    /// Encoded length in bytes.
    pub const LENGTH: usize = 7;

    /// Decode a timestamp from its wire representation.
    pub fn decode(data: &[u8]) -> WisunResult<Self> {
        if data.len() < Self::LENGTH {
            return Err(WisunError::MalformedFrame(format!(
                "Timestamp needs {} bytes, got {}",
                Self::LENGTH,
                data.len()
            )));
        }
        Ok(Self {
            year: u16::from_be_bytes([data[0], data[1]]),
            month: data[2],
            day: data[3],
            hour: data[4],
            minute: data[5],
            second: data[6],
        })
    }

    /// Wire representation of the timestamp.
    pub fn to_bytes(&self) -> [u8; Self::LENGTH] {
        let year = self.year.to_be_bytes();
        [
            year[0],
            year[1],
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
        ]
    }
}

impl fmt::Display for MeasurementDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}
