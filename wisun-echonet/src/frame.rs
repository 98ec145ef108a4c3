//! ECHONET Lite frame structure and encoding/decoding

use crate::object::EchonetObject;
use crate::service::ServiceCode;
use crate::value::{epc, FlowDirection};
use serde::{Deserialize, Serialize};
use std::fmt;
use wisun_core::{WisunError, WisunResult};

/// Fixed protocol marker (ECHONET Lite).
pub const EHD1: u8 = 0x10;
/// Fixed format marker (format 1).
pub const EHD2: u8 = 0x81;

/// Bytes preceding the property list: two header bytes, the transaction id,
/// two object identities, the service code and the property count.
const FIXED_HEADER_LENGTH: usize = 12;

/// One property entry: EPC code, PDC length and EDT payload.
///
/// The declared length always equals the payload size, so only the code and
/// the payload are stored. Payloads are at most 255 bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    epc: u8,
    edt: Vec<u8>,
}

impl Property {
    /// Create a property with a payload.
    pub fn new(epc: u8, edt: Vec<u8>) -> Self {
        debug_assert!(edt.len() <= u8::MAX as usize);
        Self { epc, edt }
    }

    /// A read-request entry: the code alone, with an empty payload.
    pub fn request(epc: u8) -> Self {
        Self::new(epc, Vec::new())
    }

    /// Property code.
    pub fn epc(&self) -> u8 {
        self.epc
    }

    /// Declared payload length.
    pub fn pdc(&self) -> u8 {
        self.edt.len() as u8
    }

    /// Payload bytes.
    pub fn edt(&self) -> &[u8] {
        &self.edt
    }
}

/// An ECHONET Lite application frame.
///
/// Immutable once built; constructed either from one of the request
/// templates or by decoding received bytes. The property count field (OPC)
/// is derived from the property list, so the two cannot disagree on encode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    tid: [u8; 2],
    seoj: EchonetObject,
    deoj: EchonetObject,
    esv: u8,
    properties: Vec<Property>,
}

impl Frame {
    /// Create a frame. The transaction id is unused by this stack and is
    /// always zero; exchanges are not multiplexed.
    pub fn new(
        seoj: EchonetObject,
        deoj: EchonetObject,
        esv: u8,
        properties: Vec<Property>,
    ) -> Self {
        Self {
            tid: [0x00, 0x00],
            seoj,
            deoj,
            esv,
            properties,
        }
    }

    /// A read request from the controller to the smart meter.
    pub fn read_request(properties: Vec<Property>) -> Self {
        Self::new(
            EchonetObject::CONTROLLER,
            EchonetObject::SMART_METER,
            ServiceCode::ReadRequest.to_u8(),
            properties,
        )
    }

    /// Request the instantaneous power measurement (EPC 0xE7).
    pub fn instantaneous_power_request() -> Self {
        Self::read_request(vec![Property::request(epc::INSTANTANEOUS_POWER)])
    }

    /// Request the periodic cumulative energy measurement for one flow
    /// direction (EPC 0xEA / 0xEB).
    pub fn cumulative_energy_request(direction: FlowDirection) -> Self {
        let code = match direction {
            FlowDirection::Forward => epc::CUMULATIVE_FORWARD_AT_TIME,
            FlowDirection::Reverse => epc::CUMULATIVE_REVERSE_AT_TIME,
        };
        Self::read_request(vec![Property::request(code)])
    }

    /// Request the scaling parameters needed to convert cumulative energy
    /// readings: coefficient, effective digits and unit.
    pub fn cumulative_parameters_request() -> Self {
        Self::read_request(vec![
            Property::request(epc::COEFFICIENT),
            Property::request(epc::EFFECTIVE_DIGITS),
            Property::request(epc::ENERGY_UNIT),
        ])
    }

    /// Source object identity.
    pub fn seoj(&self) -> EchonetObject {
        self.seoj
    }

    /// Destination object identity.
    pub fn deoj(&self) -> EchonetObject {
        self.deoj
    }

    /// Raw service byte.
    pub fn esv(&self) -> u8 {
        self.esv
    }

    /// The service code, if it is a defined one.
    pub fn service_code(&self) -> Option<ServiceCode> {
        ServiceCode::from_u8(self.esv)
    }

    /// Property count (OPC).
    pub fn opc(&self) -> u8 {
        self.properties.len() as u8
    }

    /// Properties in insertion order.
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Serialize the frame. Encoding cannot fail: the length is fully
    /// determined by the property payloads and there is no padding.
    pub fn encode(&self) -> Vec<u8> {
        let length = FIXED_HEADER_LENGTH
            + self
                .properties
                .iter()
                .map(|p| 2 + p.edt.len())
                .sum::<usize>();
        let mut out = Vec::with_capacity(length);
        out.push(EHD1);
        out.push(EHD2);
        out.extend_from_slice(&self.tid);
        out.extend_from_slice(&self.seoj.to_bytes());
        out.extend_from_slice(&self.deoj.to_bytes());
        out.push(self.esv);
        out.push(self.opc());
        for property in &self.properties {
            out.push(property.epc);
            out.push(property.pdc());
            out.extend_from_slice(&property.edt);
        }
        out
    }

    /// Decode a frame from received bytes.
    ///
    /// Decoding is defensive: it never reads past the supplied buffer, and a
    /// property count that disagrees with the bytes actually present is a
    /// `MalformedFrame` error, not a partially-populated frame.
    pub fn decode(data: &[u8]) -> WisunResult<Self> {
        if data.len() < FIXED_HEADER_LENGTH {
            return Err(WisunError::MalformedFrame(format!(
                "Frame too short: {} bytes",
                data.len()
            )));
        }
        if data[0] != EHD1 || data[1] != EHD2 {
            return Err(WisunError::MalformedFrame(format!(
                "Bad frame header: 0x{:02X} 0x{:02X}",
                data[0], data[1]
            )));
        }

        let tid = [data[2], data[3]];
        let seoj = EchonetObject::new(data[4], data[5], data[6]);
        let deoj = EchonetObject::new(data[7], data[8], data[9]);
        let esv = data[10];
        let opc = data[11] as usize;

        let mut pos = FIXED_HEADER_LENGTH;
        let mut properties = Vec::with_capacity(opc);
        for index in 0..opc {
            if pos + 2 > data.len() {
                return Err(WisunError::MalformedFrame(format!(
                    "Property count {} but input ends at property {}",
                    opc, index
                )));
            }
            let code = data[pos];
            let pdc = data[pos + 1] as usize;
            pos += 2;
            if pos + pdc > data.len() {
                return Err(WisunError::MalformedFrame(format!(
                    "Property 0x{:02X} declares {} payload bytes, {} remain",
                    code,
                    pdc,
                    data.len() - pos
                )));
            }
            properties.push(Property::new(code, data[pos..pos + pdc].to_vec()));
            pos += pdc;
        }
        if pos != data.len() {
            return Err(WisunError::MalformedFrame(format!(
                "{} trailing bytes after {} properties",
                data.len() - pos,
                opc
            )));
        }

        Ok(Self {
            tid,
            seoj,
            deoj,
            esv,
            properties,
        })
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: [{}] -> [{}], {} properties",
            ServiceCode::describe(self.esv),
            self.seoj,
            self.deoj,
            self.properties.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_read_request() {
        let frame = Frame::instantaneous_power_request();
        assert_eq!(
            frame.encode(),
            vec![
                0x10, 0x81, // EHD
                0x00, 0x00, // TID
                0x05, 0xFF, 0x01, // SEOJ: controller
                0x02, 0x88, 0x01, // DEOJ: smart meter
                0x62, // ESV: read request
                0x01, // OPC
                0xE7, 0x00, // EPC + empty EDT
            ]
        );
    }

    #[test]
    fn test_round_trip() {
        let frame = Frame::new(
            EchonetObject::SMART_METER,
            EchonetObject::CONTROLLER,
            0x72,
            vec![
                Property::new(0xE7, vec![0x00, 0x00, 0x01, 0xF4]),
                Property::request(0xD3),
                Property::new(0xE1, vec![0x01]),
            ],
        );
        let decoded = Frame::decode(&frame.encode()).unwrap();
        assert_eq!(decoded, frame);
        assert_eq!(decoded.opc(), 3);
        assert_eq!(decoded.properties()[0].epc(), 0xE7);
        assert_eq!(decoded.properties()[1].pdc(), 0);
        assert_eq!(decoded.properties()[2].edt(), &[0x01]);
    }

    #[test]
    fn test_round_trip_unknown_service() {
        let frame = Frame::new(
            EchonetObject::new(0x01, 0x30, 0x02),
            EchonetObject::new(0xFF, 0x00, 0xFF),
            0x65,
            vec![Property::new(0x80, vec![0x30])],
        );
        let decoded = Frame::decode(&frame.encode()).unwrap();
        assert_eq!(decoded, frame);
        assert_eq!(decoded.service_code(), None);
    }

    #[test]
    fn test_decode_rejects_bad_header() {
        let mut data = Frame::instantaneous_power_request().encode();
        data[1] = 0x82;
        assert!(matches!(
            Frame::decode(&data),
            Err(WisunError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_decode_rejects_count_mismatch() {
        // Declares two properties but carries one.
        let mut data = Frame::instantaneous_power_request().encode();
        data[11] = 0x02;
        assert!(matches!(
            Frame::decode(&data),
            Err(WisunError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_decode_rejects_truncated_payload() {
        let frame = Frame::new(
            EchonetObject::SMART_METER,
            EchonetObject::CONTROLLER,
            0x72,
            vec![Property::new(0xE7, vec![0x00, 0x00, 0x01, 0xF4])],
        );
        let data = frame.encode();
        assert!(matches!(
            Frame::decode(&data[..data.len() - 1]),
            Err(WisunError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let mut data = Frame::instantaneous_power_request().encode();
        data.push(0x00);
        assert!(matches!(
            Frame::decode(&data),
            Err(WisunError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_cumulative_parameters_request() {
        let frame = Frame::cumulative_parameters_request();
        let codes: Vec<u8> = frame.properties().iter().map(|p| p.epc()).collect();
        assert_eq!(codes, vec![0xD3, 0xD7, 0xE1]);
        assert!(frame.properties().iter().all(|p| p.pdc() == 0));
    }

    #[test]
    fn test_cumulative_energy_request_direction() {
        let forward = Frame::cumulative_energy_request(FlowDirection::Forward);
        assert_eq!(forward.properties()[0].epc(), 0xEA);
        let reverse = Frame::cumulative_energy_request(FlowDirection::Reverse);
        assert_eq!(reverse.properties()[0].epc(), 0xEB);
    }
}
