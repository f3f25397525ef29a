//! Port traits — the boundary between the coordination layer and the
//! platform.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ LinkManager / RelayManager / CommandLink
//! ```
//!
//! Driven adapters (radio, relay pins, BLE stack) implement these traits.
//! The managers consume them via generics, so the coordination logic never
//! touches hardware directly and runs unchanged on the host.

use crate::error::{RelayError, TransportError};
use crate::relay::RelayChannel;

// ───────────────────────────────────────────────────────────────
// Radio port (driven adapter: WiFi stack)
// ───────────────────────────────────────────────────────────────

/// Request-side interface of the WiFi stack.
///
/// All request methods are fire-and-forget: completion is reported
/// asynchronously through [`RadioEvent`](crate::link::types::RadioEvent)
/// notifications delivered to the registered
/// [`LinkEvents`](crate::link::LinkEvents) handler.  Methods take `&self`
/// because requests are issued from both the router thread and the
/// notification context.
pub trait RadioPort {
    /// One-time bring-up of the underlying network capability.
    fn bring_up(&self) -> Result<(), &'static str>;

    /// Ask the stack to start a scan.
    fn request_scan(&self) -> Result<(), &'static str>;

    /// Ask the stack to associate with `ssid`.
    fn request_connect(&self, ssid: &str, password: &str) -> Result<(), &'static str>;

    /// Re-issue the last connect request (stack keeps the credentials).
    fn request_reconnect(&self) -> Result<(), &'static str>;

    /// Ask the stack to drop the association.
    fn request_disconnect(&self) -> Result<(), &'static str>;

    /// Signal strength of the current association, if any.
    fn sta_rssi(&self) -> Option<i8>;
}

// ───────────────────────────────────────────────────────────────
// Switch port (driven adapter: relay pins)
// ───────────────────────────────────────────────────────────────

/// Pin-level interface of the relay board.
pub trait SwitchPort {
    /// Drive a channel's output level.
    fn drive(&mut self, channel: RelayChannel, on: bool) -> Result<(), RelayError>;

    /// Last driven level of a channel.
    fn level(&self, channel: RelayChannel) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Notify port (driven adapter: BLE stack)
// ───────────────────────────────────────────────────────────────

/// A nearby peer found during a BLE scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerRecord {
    /// Advertised name, or the address string when the peer is nameless.
    pub name: heapless::String<32>,
    pub rssi: i8,
}

/// Raw operations of the BLE command channel.
///
/// The [`CommandLink`](crate::transport::CommandLink) service layers
/// naming, fragmentation and bookkeeping on top; adapters only move
/// bytes.  `notify` is handed fragments no larger than the configured
/// fragment size, in order, and applies no framing of its own.
pub trait NotifyPort {
    fn start_advertising(&mut self, name: &str) -> Result<(), TransportError>;

    fn stop_advertising(&mut self) -> Result<(), TransportError>;

    fn is_connected(&self) -> bool;

    /// Send one outbound fragment to the connected peer.
    fn notify(&mut self, fragment: &[u8]) -> Result<(), TransportError>;

    /// Blocking peer discovery for `duration_secs`.
    fn scan_peers(&mut self, duration_secs: u32) -> Result<Vec<PeerRecord>, TransportError>;
}
