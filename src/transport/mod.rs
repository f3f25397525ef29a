//! BLE command channel service.
//!
//! [`CommandLink`] layers the command-console semantics on top of a raw
//! [`NotifyPort`] adapter: device naming, advertising lifecycle, the
//! inbound payload queue, and outbound response fragmentation.
//!
//! ## Payload contract
//!
//! An inbound payload is one complete command line — there is no
//! inter-fragment command boundary logic on the receive side.  Outbound
//! responses longer than the fragment limit are split into plain,
//! headerless slices of at most that size and sent in order; a dropped
//! fragment is neither detected nor retried at this layer.
//!
//! The service is shared behind a mutex by its callers: the router's
//! explicit BLE commands and the disconnect-driven re-advertising path
//! both reach the single connection handle, so outbound operations are
//! serialized.

use std::collections::VecDeque;

use log::{info, warn};

use crate::app::ports::{NotifyPort, PeerRecord};
use crate::error::{Result, TransportError};

/// Bound on queued inbound command lines; beyond this the oldest line is
/// dropped (a stalled consumer must not grow the heap unbounded).
const INBOUND_QUEUE_CAP: usize = 8;

/// Split a payload into in-order fragments of at most `max` bytes.
///
/// No headers, no padding: concatenating the fragments reproduces the
/// payload exactly, for any length including zero (which yields no
/// fragments at all).
pub fn fragments(data: &[u8], max: usize) -> impl Iterator<Item = &[u8]> {
    data.chunks(max.max(1))
}

// ───────────────────────────────────────────────────────────────
// CommandLink
// ───────────────────────────────────────────────────────────────

pub struct CommandLink<N: NotifyPort> {
    port: N,
    device_name: heapless::String<24>,
    advertising: bool,
    fragment_bytes: usize,
    inbound: VecDeque<String>,
    frames_sent: u32,
    bytes_sent: u32,
}

impl<N: NotifyPort> CommandLink<N> {
    pub fn new(port: N, device_name: &heapless::String<24>, fragment_bytes: usize) -> Self {
        Self {
            port,
            device_name: device_name.clone(),
            advertising: false,
            fragment_bytes: fragment_bytes.max(1),
            inbound: VecDeque::new(),
            frames_sent: 0,
            bytes_sent: 0,
        }
    }

    // ── Advertising lifecycle ─────────────────────────────────

    pub fn start(&mut self) -> Result<()> {
        self.port.start_advertising(self.device_name.as_str())?;
        self.advertising = true;
        info!("ble: advertising as '{}'", self.device_name);
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        self.port.stop_advertising()?;
        self.advertising = false;
        info!("ble: advertising stopped");
        Ok(())
    }

    pub fn is_advertising(&self) -> bool {
        self.advertising
    }

    pub fn is_connected(&self) -> bool {
        self.port.is_connected()
    }

    /// Update the advertised name.  Takes effect on the next advertising
    /// start.
    pub fn set_device_name(&mut self, name: &str) -> Result<()> {
        let mut new_name = heapless::String::new();
        new_name
            .push_str(name)
            .map_err(|_| TransportError::NameTooLong)?;
        self.device_name = new_name;
        info!("ble: device name set to '{}'", self.device_name);
        Ok(())
    }

    pub fn device_name(&self) -> &str {
        self.device_name.as_str()
    }

    // ── Peer events (called from the adapter's event context) ─

    pub fn on_peer_connected(&mut self) {
        info!("ble: peer connected");
    }

    /// Peer dropped: flush any half-consumed inbound line and, if the
    /// service is running, re-advertise so the next peer can find us.
    pub fn on_peer_disconnected(&mut self) {
        info!("ble: peer disconnected");
        self.inbound.clear();
        if self.advertising {
            if let Err(e) = self.port.start_advertising(self.device_name.as_str()) {
                warn!("ble: re-advertise failed — {}", e);
            }
        }
    }

    // ── Inbound ───────────────────────────────────────────────

    /// Accept one inbound payload as one command line.
    pub fn on_payload(&mut self, data: &[u8]) {
        let line = String::from_utf8_lossy(data).trim().to_owned();
        if line.is_empty() {
            return;
        }
        if self.inbound.len() >= INBOUND_QUEUE_CAP {
            warn!("ble: inbound queue full, dropping oldest line");
            self.inbound.pop_front();
        }
        self.inbound.push_back(line);
    }

    /// Next queued command line, if any.
    pub fn take_inbound(&mut self) -> Option<String> {
        self.inbound.pop_front()
    }

    // ── Outbound ──────────────────────────────────────────────

    /// Send a response, fragmenting as needed.  Fragments go out in
    /// order; the first driver failure aborts the rest.
    pub fn send_response(&mut self, text: &str) -> Result<()> {
        if !self.port.is_connected() {
            return Err(TransportError::NotConnected.into());
        }
        for frag in fragments(text.as_bytes(), self.fragment_bytes) {
            self.port.notify(frag)?;
            self.frames_sent = self.frames_sent.wrapping_add(1);
            self.bytes_sent = self.bytes_sent.wrapping_add(frag.len() as u32);
        }
        Ok(())
    }

    /// Blocking peer discovery passthrough.
    pub fn scan_peers(&mut self, duration_secs: u32) -> Result<Vec<PeerRecord>> {
        Ok(self.port.scan_peers(duration_secs)?)
    }

    // ── Bookkeeping ───────────────────────────────────────────

    /// Direct access to the underlying adapter (event wiring, tests).
    pub fn port(&self) -> &N {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut N {
        &mut self.port
    }

    pub fn fragment_bytes(&self) -> usize {
        self.fragment_bytes
    }

    pub fn frames_sent(&self) -> u32 {
        self.frames_sent
    }

    pub fn bytes_sent(&self) -> u32 {
        self.bytes_sent
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
