//! Application core — command routing and the port boundary.
//!
//! The router is the single entry point for both input channels; all
//! hardware interaction flows through the port traits in [`ports`],
//! keeping this layer fully testable without real peripherals.

pub mod args;
pub mod ports;
pub mod router;
pub mod verbs;
