//! Hex string helpers for the adapter's ASCII command protocol

use crate::error::{WisunError, WisunResult};
use std::fmt::Write as _;

/// Encode bytes as an upper-case hex string.
pub fn encode_upper(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for byte in data {
        let _ = write!(out, "{:02X}", byte);
    }
    out
}

/// Decode a hex string into bytes. Upper and lower case are accepted.
pub fn decode(text: &str) -> WisunResult<Vec<u8>> {
    if text.len() % 2 != 0 {
        return Err(WisunError::InvalidData(format!(
            "Hex string has odd length: {}",
            text.len()
        )));
    }
    let mut out = Vec::with_capacity(text.len() / 2);
    for pair in text.as_bytes().chunks(2) {
        let digits = std::str::from_utf8(pair)
            .map_err(|_| WisunError::InvalidData("Hex string is not ASCII".to_string()))?;
        let value = u8::from_str_radix(digits, 16)
            .map_err(|_| WisunError::InvalidData(format!("Invalid hex byte: {}", digits)))?;
        out.push(value);
    }
    Ok(out)
}

/// Parse a hex field such as a UDP port or payload length.
pub fn parse_u16(text: &str) -> WisunResult<u16> {
    u16::from_str_radix(text, 16)
        .map_err(|_| WisunError::InvalidData(format!("Invalid hex value: {}", text)))
}
