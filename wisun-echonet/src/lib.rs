//! ECHONET Lite frame codec
//!
//! This crate defines the application-layer message format exchanged with a
//! smart utility meter: object identities, the binary frame structure with
//! its property list, and the semantic interpretation of property payloads
//! per object class.
//!
//! The codec is pure; carrying frames over the adapter link is the session
//! layer's job.

pub mod datetime;
pub mod frame;
pub mod object;
pub mod service;
pub mod value;

pub use datetime::MeasurementDateTime;
pub use frame::{Frame, Property, EHD1, EHD2};
pub use object::EchonetObject;
pub use service::ServiceCode;
pub use value::{epc, interpret, unit_multiplier, FlowDirection, PropertyValue};
pub use wisun_core::{WisunError, WisunResult};
