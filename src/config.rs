//! System configuration parameters
//!
//! All tunable parameters for the netrelay firmware.  The defaults mirror
//! the board bring-up values; integration tests shrink the timeouts so the
//! blocking paths can be exercised quickly on the host.

use serde::{Deserialize, Serialize};

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- WiFi link ---
    /// Bound on a blocking scan, in milliseconds
    pub scan_timeout_ms: u32,
    /// Bound on a blocking connect, in milliseconds
    pub connect_timeout_ms: u32,
    /// Consecutive link-down events tolerated before the link is declared failed
    pub max_connect_retries: u8,
    /// Cap on the number of scan results retained
    pub max_scan_results: usize,

    // --- BLE console ---
    /// Name advertised by the BLE command channel
    pub ble_device_name: heapless::String<24>,
    /// Maximum outbound notification fragment, in bytes
    pub ble_fragment_bytes: usize,
    /// BLE peer scan duration used when none is given (seconds)
    pub ble_scan_default_secs: u32,
    /// Longest accepted BLE peer scan duration (seconds)
    pub ble_scan_max_secs: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        let mut name = heapless::String::new();
        // 11 ASCII bytes always fit in a String<24>.
        let _ = name.push_str("netrelay-p4");
        Self {
            // WiFi link
            scan_timeout_ms: 10_000,
            connect_timeout_ms: 30_000,
            max_connect_retries: 5,
            max_scan_results: 20,

            // BLE console
            ble_device_name: name,
            ble_fragment_bytes: 180,
            ble_scan_default_secs: 5,
            ble_scan_max_secs: 60,
        }
    }
}
