//! Core types and utilities for the Wi-SUN B-route stack
//!
//! This crate provides the error taxonomy and small helpers shared by the
//! rest of the workspace.

pub mod error;
pub mod hex;

pub use error::{FailureReason, WisunError, WisunResult};
