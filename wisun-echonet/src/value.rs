//! Property value semantics per object class
//!
//! The same property code means different things on different object
//! classes, so interpretation is always keyed by the object identity the
//! property was read from, never by the code alone.

use crate::datetime::MeasurementDateTime;
use crate::frame::Property;
use crate::object::EchonetObject;
use serde::{Deserialize, Serialize};
use wisun_core::{WisunError, WisunResult};

/// Property codes (EPC) used by this stack.
pub mod epc {
    /// Coefficient for cumulative energy values (smart meter).
    pub const COEFFICIENT: u8 = 0xD3;
    /// Number of effective digits of the cumulative counter (smart meter).
    pub const EFFECTIVE_DIGITS: u8 = 0xD7;
    /// Cumulative energy, forward direction (smart meter).
    pub const CUMULATIVE_FORWARD: u8 = 0xE0;
    /// Unit of cumulative energy values (smart meter).
    pub const ENERGY_UNIT: u8 = 0xE1;
    /// Instantaneous power measurement (smart meter).
    pub const INSTANTANEOUS_POWER: u8 = 0xE7;
    /// Periodic cumulative energy, forward direction (smart meter).
    pub const CUMULATIVE_FORWARD_AT_TIME: u8 = 0xEA;
    /// Periodic cumulative energy, reverse direction (smart meter).
    pub const CUMULATIVE_REVERSE_AT_TIME: u8 = 0xEB;
    /// Self-node instance list notification (node profile).
    pub const INSTANCE_LIST: u8 = 0xD5;
}

/// Direction of energy flow for cumulative measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowDirection {
    /// Energy delivered to the premises.
    Forward,
    /// Energy fed back to the grid.
    Reverse,
}

/// A property payload decoded into its typed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    /// Instantaneous power in watts.
    InstantaneousPower(i32),
    /// Cumulative energy counter at a meter-recorded time. The raw counter
    /// must be scaled with the separately read coefficient and unit.
    CumulativeEnergyAtTime {
        recorded_at: MeasurementDateTime,
        raw: u32,
        direction: FlowDirection,
    },
    /// Cumulative energy counter, forward direction, unscaled.
    CumulativeEnergy(u32),
    /// Multiplier applied to cumulative energy counters.
    Coefficient(u32),
    /// Effective digit count of the cumulative counter.
    EffectiveDigits(u8),
    /// Decimal multiplier selected by the unit property.
    UnitMultiplier(f64),
    /// Object instances present on the node.
    InstanceList(Vec<EchonetObject>),
}

/// Map the unit property byte to its decimal multiplier.
///
/// Bytes outside the defined table fall back to a multiplier of 1.
pub fn unit_multiplier(code: u8) -> f64 {
    match code {
        0x00 => 1.0,
        0x01 => 0.1,
        0x02 => 0.01,
        0x03 => 0.001,
        0x04 => 0.0001,
        0x0A => 10.0,
        0x0B => 100.0,
        0x0C => 1000.0,
        0x0D => 10000.0,
        _ => 1.0,
    }
}

/// Decode a property payload according to the object class it was read
/// from.
///
/// An unrecognized (object, code) pair is an `UnknownProperty` error: the
/// value was not understood, but sibling properties in the same frame remain
/// valid and should still be processed.
pub fn interpret(object: &EchonetObject, property: &Property) -> WisunResult<PropertyValue> {
    match (object.class_group_code(), object.class_code()) {
        (0x02, 0x88) => interpret_meter(object, property),
        (0x0E, 0xF0) => interpret_node_profile(object, property),
        _ => Err(unknown(object, property)),
    }
}

fn interpret_meter(object: &EchonetObject, property: &Property) -> WisunResult<PropertyValue> {
    let edt = property.edt();
    match property.epc() {
        epc::COEFFICIENT => Ok(PropertyValue::Coefficient(be_u32(edt, "coefficient")?)),
        epc::EFFECTIVE_DIGITS => match edt {
            [digits] => Ok(PropertyValue::EffectiveDigits(*digits)),
            _ => Err(malformed("effective digits", 1, edt.len())),
        },
        epc::CUMULATIVE_FORWARD => Ok(PropertyValue::CumulativeEnergy(be_u32(
            edt,
            "cumulative energy",
        )?)),
        epc::ENERGY_UNIT => match edt {
            [code] => Ok(PropertyValue::UnitMultiplier(unit_multiplier(*code))),
            _ => Err(malformed("energy unit", 1, edt.len())),
        },
        epc::INSTANTANEOUS_POWER => match edt {
            [a, b, c, d] => Ok(PropertyValue::InstantaneousPower(i32::from_be_bytes([
                *a, *b, *c, *d,
            ]))),
            _ => Err(malformed("instantaneous power", 4, edt.len())),
        },
        epc::CUMULATIVE_FORWARD_AT_TIME => cumulative_at_time(edt, FlowDirection::Forward),
        epc::CUMULATIVE_REVERSE_AT_TIME => cumulative_at_time(edt, FlowDirection::Reverse),
        _ => Err(unknown(object, property)),
    }
}

fn interpret_node_profile(
    object: &EchonetObject,
    property: &Property,
) -> WisunResult<PropertyValue> {
    match property.epc() {
        epc::INSTANCE_LIST => instance_list(property.edt()),
        _ => Err(unknown(object, property)),
    }
}

/// An 11-byte periodic measurement: 7-byte timestamp plus the raw counter.
fn cumulative_at_time(edt: &[u8], direction: FlowDirection) -> WisunResult<PropertyValue> {
    let expected = MeasurementDateTime::LENGTH + 4;
    if edt.len() != expected {
        return Err(malformed("periodic cumulative energy", expected, edt.len()));
    }
    let recorded_at = MeasurementDateTime::decode(edt)?;
    let raw = be_u32(&edt[MeasurementDateTime::LENGTH..], "cumulative counter")?;
    Ok(PropertyValue::CumulativeEnergyAtTime {
        recorded_at,
        raw,
        direction,
    })
}

/// A count byte followed by that many 3-byte object identities.
fn instance_list(edt: &[u8]) -> WisunResult<PropertyValue> {
    let Some((&count, rest)) = edt.split_first() else {
        return Err(WisunError::MalformedFrame(
            "Empty instance list payload".to_string(),
        ));
    };
    let count = count as usize;
    if rest.len() < count * 3 {
        return Err(WisunError::MalformedFrame(format!(
            "Instance list declares {} entries, {} bytes remain",
            count,
            rest.len()
        )));
    }
    let instances = rest[..count * 3]
        .chunks_exact(3)
        .map(|triple| EchonetObject::new(triple[0], triple[1], triple[2]))
        .collect();
    Ok(PropertyValue::InstanceList(instances))
}

fn be_u32(edt: &[u8], what: &str) -> WisunResult<u32> {
    match edt {
        [a, b, c, d] => Ok(u32::from_be_bytes([*a, *b, *c, *d])),
        _ => Err(malformed(what, 4, edt.len())),
    }
}

fn malformed(what: &str, expected: usize, actual: usize) -> WisunError {
    WisunError::MalformedFrame(format!(
        "{} payload needs {} bytes, got {}",
        what, expected, actual
    ))
}

fn unknown(object: &EchonetObject, property: &Property) -> WisunError {
    WisunError::UnknownProperty {
        object: object.to_string(),
        epc: property.epc(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Property;

    #[test]
    fn test_unit_multiplier_table() {
        assert_eq!(unit_multiplier(0x00), 1.0);
        assert_eq!(unit_multiplier(0x01), 0.1);
        assert_eq!(unit_multiplier(0x02), 0.01);
        assert_eq!(unit_multiplier(0x03), 0.001);
        assert_eq!(unit_multiplier(0x04), 0.0001);
        assert_eq!(unit_multiplier(0x0A), 10.0);
        assert_eq!(unit_multiplier(0x0B), 100.0);
        assert_eq!(unit_multiplier(0x0C), 1000.0);
        assert_eq!(unit_multiplier(0x0D), 10000.0);
        assert_eq!(unit_multiplier(0xFF), 1.0);
        assert_eq!(unit_multiplier(0x05), 1.0);
    }

    #[test]
    fn test_instantaneous_power() {
        let property = Property::new(epc::INSTANTANEOUS_POWER, vec![0x00, 0x00, 0x01, 0xF4]);
        let value = interpret(&EchonetObject::SMART_METER, &property).unwrap();
        assert_eq!(value, PropertyValue::InstantaneousPower(500));
    }

    #[test]
    fn test_instantaneous_power_negative() {
        let property = Property::new(epc::INSTANTANEOUS_POWER, vec![0xFF, 0xFF, 0xFE, 0x0C]);
        let value = interpret(&EchonetObject::SMART_METER, &property).unwrap();
        assert_eq!(value, PropertyValue::InstantaneousPower(-500));
    }

    #[test]
    fn test_instantaneous_power_wrong_length() {
        let property = Property::new(epc::INSTANTANEOUS_POWER, vec![0x01, 0xF4]);
        assert!(matches!(
            interpret(&EchonetObject::SMART_METER, &property),
            Err(WisunError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_cumulative_at_time() {
        let mut edt = vec![0x07, 0xE9, 0x08, 0x06, 0x0C, 0x00, 0x00];
        edt.extend_from_slice(&[0x00, 0x01, 0x86, 0xA0]);
        let property = Property::new(epc::CUMULATIVE_FORWARD_AT_TIME, edt);
        match interpret(&EchonetObject::SMART_METER, &property).unwrap() {
            PropertyValue::CumulativeEnergyAtTime {
                recorded_at,
                raw,
                direction,
            } => {
                assert_eq!(recorded_at.year, 2025);
                assert_eq!(recorded_at.hour, 12);
                assert_eq!(raw, 100_000);
                assert_eq!(direction, FlowDirection::Forward);
            }
            other => panic!("unexpected value: {:?}", other),
        }
    }

    #[test]
    fn test_cumulative_reverse_direction() {
        let edt = vec![
            0x07, 0xE9, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2A,
        ];
        let property = Property::new(epc::CUMULATIVE_REVERSE_AT_TIME, edt);
        match interpret(&EchonetObject::SMART_METER, &property).unwrap() {
            PropertyValue::CumulativeEnergyAtTime { raw, direction, .. } => {
                assert_eq!(raw, 42);
                assert_eq!(direction, FlowDirection::Reverse);
            }
            other => panic!("unexpected value: {:?}", other),
        }
    }

    #[test]
    fn test_scaling_parameters() {
        let coefficient = Property::new(epc::COEFFICIENT, vec![0x00, 0x00, 0x00, 0x01]);
        assert_eq!(
            interpret(&EchonetObject::SMART_METER, &coefficient).unwrap(),
            PropertyValue::Coefficient(1)
        );
        let digits = Property::new(epc::EFFECTIVE_DIGITS, vec![0x06]);
        assert_eq!(
            interpret(&EchonetObject::SMART_METER, &digits).unwrap(),
            PropertyValue::EffectiveDigits(6)
        );
        let unit = Property::new(epc::ENERGY_UNIT, vec![0x01]);
        assert_eq!(
            interpret(&EchonetObject::SMART_METER, &unit).unwrap(),
            PropertyValue::UnitMultiplier(0.1)
        );
    }

    #[test]
    fn test_instance_list() {
        let property = Property::new(
            epc::INSTANCE_LIST,
            vec![0x02, 0x02, 0x88, 0x01, 0x05, 0xFF, 0x01],
        );
        let value = interpret(&EchonetObject::NODE_PROFILE, &property).unwrap();
        assert_eq!(
            value,
            PropertyValue::InstanceList(vec![
                EchonetObject::SMART_METER,
                EchonetObject::CONTROLLER,
            ])
        );
    }

    #[test]
    fn test_instance_list_truncated() {
        let property = Property::new(epc::INSTANCE_LIST, vec![0x02, 0x02, 0x88, 0x01]);
        assert!(matches!(
            interpret(&EchonetObject::NODE_PROFILE, &property),
            Err(WisunError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_unknown_property_is_reported() {
        let property = Property::new(0x42, vec![0x00]);
        match interpret(&EchonetObject::SMART_METER, &property) {
            Err(WisunError::UnknownProperty { epc, .. }) => assert_eq!(epc, 0x42),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_property_code_is_scoped_by_class() {
        // 0xD5 means instance list on the node profile, nothing on a meter.
        let property = Property::new(epc::INSTANCE_LIST, vec![0x01, 0x02, 0x88, 0x01]);
        assert!(interpret(&EchonetObject::NODE_PROFILE, &property).is_ok());
        assert!(matches!(
            interpret(&EchonetObject::SMART_METER, &property),
            Err(WisunError::UnknownProperty { .. })
        ));
    }
}
