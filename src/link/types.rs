//! Link-layer data types shared between the manager, the radio adapter
//! and the command router.

use serde::{Deserialize, Serialize};

/// Network identifier, bounded to the 32-byte SSID limit.
pub type Ssid = heapless::String<32>;

/// Dotted-quad address string ("192.168.1.17" worst case is 15 bytes).
pub type IpText = heapless::String<16>;

// ───────────────────────────────────────────────────────────────
// Security kind
// ───────────────────────────────────────────────────────────────

/// Authentication scheme of a scanned network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecurityKind {
    Open,
    Wep,
    Wpa,
    Wpa2,
    WpaWpa2,
    Wpa3,
    Unknown,
}

impl SecurityKind {
    /// Human-readable label.  Exhaustive by construction — adding a
    /// variant without a label is a compile error.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::Wep => "WEP",
            Self::Wpa => "WPA",
            Self::Wpa2 => "WPA2",
            Self::WpaWpa2 => "WPA/WPA2",
            Self::Wpa3 => "WPA3",
            Self::Unknown => "Unknown",
        }
    }

    /// Whether joining this network requires a password.
    pub const fn requires_password(self) -> bool {
        !matches!(self, Self::Open)
    }
}

// ───────────────────────────────────────────────────────────────
// Scan records
// ───────────────────────────────────────────────────────────────

/// One network found during a scan.  Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRecord {
    pub ssid: Ssid,
    /// Received signal strength in dBm; higher (less negative) is stronger.
    pub rssi: i8,
    pub security: SecurityKind,
}

impl NetworkRecord {
    pub fn new(ssid: &str, rssi: i8, security: SecurityKind) -> Option<Self> {
        let mut s = Ssid::new();
        s.push_str(ssid).ok()?;
        Some(Self { ssid: s, rssi, security })
    }
}

/// Build the retained scan list from raw records: drop empty identifiers,
/// order by signal strength descending (ties keep first-seen order), cap
/// at `max`.
pub fn build_scan_list(mut raw: Vec<NetworkRecord>, max: usize) -> Vec<NetworkRecord> {
    raw.retain(|r| !r.ssid.is_empty());
    // Stable sort: equal-rssi entries keep their scan order.
    raw.sort_by(|a, b| b.rssi.cmp(&a.rssi));
    raw.truncate(max);
    raw
}

// ───────────────────────────────────────────────────────────────
// Connection state
// ───────────────────────────────────────────────────────────────

/// Connection state of the WiFi link.  Exactly one instance lives inside
/// the manager's shared container; only the defined transitions mutate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    Scanning,
    Connecting { target: Ssid },
    Connected { target: Ssid },
    Retrying { target: Ssid, attempt: u8 },
    Failed { target: Ssid },
}

impl LinkState {
    /// Short state tag for status rendering.
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Scanning => "Scanning",
            Self::Connecting { .. } => "Connecting",
            Self::Connected { .. } => "Connected",
            Self::Retrying { .. } => "Retrying",
            Self::Failed { .. } => "Failed",
        }
    }

    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    /// The identifier the state is about, if any.
    pub fn target(&self) -> Option<&Ssid> {
        match self {
            Self::Idle | Self::Scanning => None,
            Self::Connecting { target }
            | Self::Connected { target }
            | Self::Retrying { target, .. }
            | Self::Failed { target } => Some(target),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Radio notifications
// ───────────────────────────────────────────────────────────────

/// Asynchronous notifications delivered by the radio adapter.
#[derive(Debug, Clone)]
pub enum RadioEvent {
    /// A scan finished; carries the raw records as decoded by the adapter.
    ScanComplete(Vec<NetworkRecord>),
    /// The association came up (address not yet assigned).
    LinkUp,
    /// The association was lost.
    LinkDown,
    /// An address was assigned; the link is fully up.
    AddressAcquired(IpText),
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
