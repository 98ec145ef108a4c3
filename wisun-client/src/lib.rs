//! Smart meter reading client
//!
//! This crate sits on top of the adapter session: it runs the join
//! handshake, keeps the cumulative-energy scaling parameters cached, polls
//! the meter for instantaneous power and cumulative energy on configured
//! intervals, and publishes converted readings.

pub mod config;
pub mod parameters;
pub mod reader;

pub use config::ClientConfig;
pub use parameters::CumulativeParameters;
pub use reader::{MeterReader, MeterReading};
pub use wisun_core::{WisunError, WisunResult};
