//! Board pin assignments.
//!
//! Dual relay board variant: both relays are active-high outputs.

/// Relay channel 1 output.
pub const RELAY_1_GPIO: u8 = 32;

/// Relay channel 2 output.
pub const RELAY_2_GPIO: u8 = 46;
