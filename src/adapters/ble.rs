//! BLE command-channel adapter.
//!
//! Implements [`NotifyPort`] — the raw byte-moving half of the BLE
//! console.  The [`CommandLink`](crate::transport::CommandLink) service
//! owns naming, fragmentation and the inbound queue; this adapter owns
//! the stack.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: Bluedroid GATT server via
//!   `esp_idf_svc::sys` with a UART-style service: one Write
//!   characteristic (peer → device, command lines) and one Notify
//!   characteristic (device → peer, response fragments).
//! - **all other targets**: a recording simulation for host-side tests.
//!
//! ## GATT Service Layout
//!
//! | Characteristic | UUID                                   | Perms  |
//! |----------------|----------------------------------------|--------|
//! | Console RX     | `6e400002-b5a3-f393-e0a9-e50e24dcca9e` | Write  |
//! | Console TX     | `6e400003-b5a3-f393-e0a9-e50e24dcca9e` | Notify |
//!
//! Bluedroid callbacks are C function pointers that cannot capture Rust
//! closures; the statics below bridge the callback context to the main
//! loop, which drains inbound writes with [`take_rx_data`].

use log::info;

use crate::app::ports::{NotifyPort, PeerRecord};
use crate::error::TransportError;

// ── Constants ────────────────────────────────────────────────

pub const SERVICE_UUID: u128 = 0x6e400001_b5a3_f393_e0a9_e50e24dcca9e;
pub const CHAR_CONSOLE_RX: u128 = 0x6e400002_b5a3_f393_e0a9_e50e24dcca9e;
pub const CHAR_CONSOLE_TX: u128 = 0x6e400003_b5a3_f393_e0a9_e50e24dcca9e;

/// Longest inbound command line accepted over BLE.
const MAX_RX_BYTES: usize = 256;

// ── ESP-IDF static callback bridge ───────────────────────────

#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering as AtomicOrdering};

#[cfg(target_os = "espidf")]
static BLE_GATTS_IF: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_CONN_ID: AtomicU32 = AtomicU32::new(u32::MAX);
#[cfg(target_os = "espidf")]
static BLE_SVC_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_RX_CHAR_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_TX_CHAR_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_CHAR_STEP: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_PEER_CONNECTED: AtomicBool = AtomicBool::new(false);
#[cfg(target_os = "espidf")]
static BLE_PEER_EVENT: AtomicU32 = AtomicU32::new(0);

// Inbound writes bridging the GATTS callback → main loop.  GATTS
// callbacks run in the Bluedroid task (not ISR), so std Mutex is safe.
#[cfg(target_os = "espidf")]
static BLE_RX_BUF: std::sync::Mutex<heapless::Vec<u8, MAX_RX_BYTES>> =
    std::sync::Mutex::new(heapless::Vec::new());

/// Consume command bytes written by the peer via GATT.
#[cfg(target_os = "espidf")]
pub fn take_rx_data() -> Option<heapless::Vec<u8, MAX_RX_BYTES>> {
    BLE_RX_BUF.lock().ok().and_then(|mut buf| {
        if buf.is_empty() {
            return None;
        }
        let data = buf.clone();
        buf.clear();
        Some(data)
    })
}

#[cfg(not(target_os = "espidf"))]
pub fn take_rx_data() -> Option<heapless::Vec<u8, MAX_RX_BYTES>> {
    None
}

/// Peer connect/disconnect edge recorded by the GATTS callback.
/// 1 = connected, 2 = disconnected, 0 = none pending.
#[cfg(target_os = "espidf")]
pub fn take_peer_event() -> Option<bool> {
    match BLE_PEER_EVENT.swap(0, AtomicOrdering::AcqRel) {
        1 => Some(true),
        2 => Some(false),
        _ => None,
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn take_peer_event() -> Option<bool> {
    None
}

#[cfg(target_os = "espidf")]
fn uuid128_to_esp(uuid: u128) -> esp_idf_svc::sys::esp_bt_uuid_t {
    let mut t: esp_idf_svc::sys::esp_bt_uuid_t = unsafe { core::mem::zeroed() };
    t.len = 16;
    unsafe {
        t.uuid.uuid128 = uuid.to_le_bytes();
    }
    t
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gap_event_handler(
    event: esp_idf_svc::sys::esp_gap_ble_cb_event_t,
    _param: *mut esp_idf_svc::sys::esp_ble_gap_cb_param_t,
) {
    use esp_idf_svc::sys::*;
    match event {
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => {
            log::info!("BLE GAP: advertising started");
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_STOP_COMPLETE_EVT => {
            log::info!("BLE GAP: advertising stopped");
        }
        _ => {}
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gatts_event_handler(
    event: esp_idf_svc::sys::esp_gatts_cb_event_t,
    gatts_if: esp_idf_svc::sys::esp_gatt_if_t,
    param: *mut esp_idf_svc::sys::esp_ble_gatts_cb_param_t,
) {
    use esp_idf_svc::sys::*;

    BLE_GATTS_IF.store(gatts_if as u32, AtomicOrdering::Relaxed);

    match event {
        esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
            log::info!("BLE GATTS: app registered (if={})", gatts_if);
            let svc_uuid = uuid128_to_esp(SERVICE_UUID);
            let mut svc_id = esp_gatt_srvc_id_t {
                id: esp_gatt_id_t {
                    uuid: svc_uuid,
                    inst_id: 0,
                },
                is_primary: true,
            };
            unsafe {
                esp_ble_gatts_create_service(gatts_if, &mut svc_id, 8);
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
            let p = unsafe { &(*param).create };
            let svc_handle = p.service_handle;
            BLE_SVC_HANDLE.store(svc_handle as u32, AtomicOrdering::Relaxed);
            log::info!("BLE GATTS: service created (handle={})", svc_handle);
            unsafe {
                esp_ble_gatts_start_service(svc_handle);
                BLE_CHAR_STEP.store(1, AtomicOrdering::Relaxed);
                let mut rx_uuid = uuid128_to_esp(CHAR_CONSOLE_RX);
                esp_ble_gatts_add_char(
                    svc_handle,
                    &mut rx_uuid,
                    ESP_GATT_PERM_WRITE as esp_gatt_perm_t,
                    ESP_GATT_CHAR_PROP_BIT_WRITE as esp_gatt_char_prop_t,
                    core::ptr::null_mut(),
                    core::ptr::null_mut(),
                );
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => {
            let p = unsafe { &(*param).add_char };
            let handle = p.attr_handle;
            let svc_handle = BLE_SVC_HANDLE.load(AtomicOrdering::Relaxed) as u16;
            match BLE_CHAR_STEP.load(AtomicOrdering::Relaxed) {
                1 => {
                    BLE_RX_CHAR_HANDLE.store(handle as u32, AtomicOrdering::Relaxed);
                    log::info!("BLE GATTS: console RX char (handle={})", handle);
                    BLE_CHAR_STEP.store(2, AtomicOrdering::Relaxed);
                    unsafe {
                        let mut tx_uuid = uuid128_to_esp(CHAR_CONSOLE_TX);
                        esp_ble_gatts_add_char(
                            svc_handle,
                            &mut tx_uuid,
                            ESP_GATT_PERM_READ as esp_gatt_perm_t,
                            (ESP_GATT_CHAR_PROP_BIT_READ | ESP_GATT_CHAR_PROP_BIT_NOTIFY)
                                as esp_gatt_char_prop_t,
                            core::ptr::null_mut(),
                            core::ptr::null_mut(),
                        );
                    }
                }
                2 => {
                    BLE_TX_CHAR_HANDLE.store(handle as u32, AtomicOrdering::Relaxed);
                    BLE_CHAR_STEP.store(3, AtomicOrdering::Relaxed);
                    log::info!("BLE GATTS: console TX char (handle={}) — ready", handle);
                }
                _ => {}
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
            let p = unsafe { &(*param).connect };
            BLE_CONN_ID.store(p.conn_id as u32, AtomicOrdering::Relaxed);
            BLE_PEER_CONNECTED.store(true, AtomicOrdering::Release);
            BLE_PEER_EVENT.store(1, AtomicOrdering::Release);
            log::info!("BLE GATTS: peer connected (conn_id={})", p.conn_id);
        }
        esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
            BLE_CONN_ID.store(u32::MAX, AtomicOrdering::Relaxed);
            BLE_PEER_CONNECTED.store(false, AtomicOrdering::Release);
            BLE_PEER_EVENT.store(2, AtomicOrdering::Release);
            log::info!("BLE GATTS: peer disconnected");
            // Re-advertising is decided by the CommandLink service when the
            // main loop drains this edge via take_peer_event().
        }
        esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT => {
            let p = unsafe { &(*param).write };
            if p.handle as u32 == BLE_RX_CHAR_HANDLE.load(AtomicOrdering::Relaxed) {
                let data = unsafe { core::slice::from_raw_parts(p.value, p.len as usize) };
                if let Ok(mut buf) = BLE_RX_BUF.lock() {
                    buf.clear();
                    let _ = buf.extend_from_slice(&data[..data.len().min(MAX_RX_BYTES)]);
                }
            }
        }
        _ => {}
    }
}

// ───────────────────────────────────────────────────────────────
// BleLink adapter
// ───────────────────────────────────────────────────────────────

pub struct BleLink {
    #[cfg(not(target_os = "espidf"))]
    sim: SimState,
}

#[cfg(not(target_os = "espidf"))]
struct SimState {
    advertising: bool,
    connected: bool,
    sent: Vec<Vec<u8>>,
    peers: Vec<PeerRecord>,
}

impl BleLink {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            sim: SimState {
                advertising: false,
                connected: false,
                sent: Vec::new(),
                peers: Vec::new(),
            },
        }
    }

    // ── Simulation hooks (host tests / sim main loop) ─────────

    /// Mark a simulated peer as connected.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_peer_connect(&mut self) {
        self.sim.connected = true;
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_peer_disconnect(&mut self) {
        self.sim.connected = false;
    }

    /// Frames the simulation has "notified" so far.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_sent(&self) -> &[Vec<u8>] {
        &self.sim.sent
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_is_advertising(&self) -> bool {
        self.sim.advertising
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_peers(&mut self, peers: Vec<PeerRecord>) {
        self.sim.peers = peers;
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_start_advertising(&mut self, name: &str) -> Result<(), TransportError> {
        use esp_idf_svc::sys::*;
        unsafe {
            // First start brings the whole stack up; subsequent starts
            // only resume advertising.
            if BLE_CHAR_STEP.load(AtomicOrdering::Relaxed) == 0 {
                esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

                let mut bt_cfg = esp_bt_controller_config_t::default();
                if esp_bt_controller_init(&mut bt_cfg) != ESP_OK as i32 {
                    return Err(TransportError::Driver("bt controller init failed"));
                }
                if esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE) != ESP_OK as i32 {
                    return Err(TransportError::Driver("bt controller enable failed"));
                }
                if esp_bluedroid_init() != ESP_OK as i32 {
                    return Err(TransportError::Driver("bluedroid init failed"));
                }
                if esp_bluedroid_enable() != ESP_OK as i32 {
                    return Err(TransportError::Driver("bluedroid enable failed"));
                }

                esp_ble_gap_register_callback(Some(ble_gap_event_handler));
                esp_ble_gatts_register_callback(Some(ble_gatts_event_handler));
                esp_ble_gatts_app_register(0);
            }

            let name_bytes = name.as_bytes();
            esp_ble_gap_set_device_name(name_bytes.as_ptr().cast());

            let mut adv_params = esp_ble_adv_params_t {
                adv_int_min: 0x20,
                adv_int_max: 0x40,
                adv_type: esp_ble_adv_type_t_ADV_TYPE_IND,
                own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
                channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
                adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
                ..core::mem::zeroed()
            };
            if esp_ble_gap_start_advertising(&mut adv_params) != ESP_OK as i32 {
                return Err(TransportError::Driver("advertising start failed"));
            }
        }
        info!("BLE(espidf): advertising as '{}'", name);
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start_advertising(&mut self, name: &str) -> Result<(), TransportError> {
        self.sim.advertising = true;
        info!("BLE(sim): advertising '{}' (service {:032x})", name, SERVICE_UUID);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_stop_advertising(&mut self) -> Result<(), TransportError> {
        use esp_idf_svc::sys::*;
        let ret = unsafe { esp_ble_gap_stop_advertising() };
        if ret == ESP_OK as i32 {
            Ok(())
        } else {
            Err(TransportError::Driver("advertising stop failed"))
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_stop_advertising(&mut self) -> Result<(), TransportError> {
        self.sim.advertising = false;
        info!("BLE(sim): stopped");
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        BLE_PEER_CONNECTED.load(AtomicOrdering::Acquire)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        self.sim.connected
    }

    #[cfg(target_os = "espidf")]
    fn platform_notify(&mut self, fragment: &[u8]) -> Result<(), TransportError> {
        use esp_idf_svc::sys::*;
        let conn = BLE_CONN_ID.load(AtomicOrdering::Relaxed);
        let handle = BLE_TX_CHAR_HANDLE.load(AtomicOrdering::Relaxed);
        if conn == u32::MAX || handle == 0 {
            return Err(TransportError::NotConnected);
        }
        let ret = unsafe {
            esp_ble_gatts_send_indicate(
                BLE_GATTS_IF.load(AtomicOrdering::Relaxed) as u8,
                conn as u16,
                handle as u16,
                fragment.len() as u16,
                fragment.as_ptr() as *mut u8,
                false,
            )
        };
        if ret == ESP_OK as i32 {
            Ok(())
        } else {
            Err(TransportError::Driver("notify failed"))
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_notify(&mut self, fragment: &[u8]) -> Result<(), TransportError> {
        if !self.sim.connected {
            return Err(TransportError::NotConnected);
        }
        self.sim.sent.push(fragment.to_vec());
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_scan_peers(&mut self, duration_secs: u32) -> Result<Vec<PeerRecord>, TransportError> {
        use esp_idf_svc::sys::*;
        unsafe {
            let mut params = esp_ble_scan_params_t {
                scan_type: esp_ble_scan_type_t_BLE_SCAN_TYPE_ACTIVE,
                own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
                scan_filter_policy: esp_ble_scan_filter_t_BLE_SCAN_FILTER_ALLOW_ALL,
                scan_interval: 0x50,
                scan_window: 0x30,
                scan_duplicate: esp_ble_scan_duplicate_t_BLE_SCAN_DUPLICATE_ENABLE,
            };
            if esp_ble_gap_set_scan_params(&mut params) != ESP_OK as i32 {
                return Err(TransportError::Driver("scan params rejected"));
            }
            if esp_ble_gap_start_scanning(duration_secs) != ESP_OK as i32 {
                return Err(TransportError::Driver("scan start failed"));
            }
        }
        // The GAP callback logs discovered peers; the scan itself runs for
        // `duration_secs`.  Block the caller for the same bound.
        std::thread::sleep(std::time::Duration::from_secs(u64::from(duration_secs)));
        Ok(Vec::new())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_scan_peers(
        &mut self,
        _duration_secs: u32,
    ) -> Result<Vec<PeerRecord>, TransportError> {
        Ok(self.sim.peers.clone())
    }
}

impl Default for BleLink {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// NotifyPort
// ───────────────────────────────────────────────────────────────

impl NotifyPort for BleLink {
    fn start_advertising(&mut self, name: &str) -> Result<(), TransportError> {
        self.platform_start_advertising(name)
    }

    fn stop_advertising(&mut self) -> Result<(), TransportError> {
        self.platform_stop_advertising()
    }

    fn is_connected(&self) -> bool {
        self.platform_is_connected()
    }

    fn notify(&mut self, fragment: &[u8]) -> Result<(), TransportError> {
        self.platform_notify(fragment)
    }

    fn scan_peers(&mut self, duration_secs: u32) -> Result<Vec<PeerRecord>, TransportError> {
        self.platform_scan_peers(duration_secs)
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
