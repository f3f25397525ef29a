//! WiFi radio adapter.
//!
//! Implements [`RadioPort`] — the request side of the WiFi stack — and
//! delivers asynchronous [`RadioEvent`]s to the [`LinkEvents`] handler
//! registered with [`WifiRadio::attach_events`].
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF driver calls via
//!   `esp_idf_svc::sys`, with an `extern "C"` trampoline registered on the
//!   default event loop.  The trampoline's context argument is the
//!   [`LinkEvents`] handle — no file-scope singleton is involved, so a
//!   second radio instance would get its own context.
//! - **all other targets**: a deterministic simulation that answers every
//!   request with canned notifications, delivered synchronously.

use std::sync::{Mutex, PoisonError};

use log::{info, warn};

use crate::app::ports::RadioPort;
use crate::link::types::{IpText, NetworkRecord, RadioEvent, SecurityKind};
use crate::link::LinkEvents;

// ───────────────────────────────────────────────────────────────
// WifiRadio
// ───────────────────────────────────────────────────────────────

pub struct WifiRadio {
    events: Mutex<Option<LinkEvents<WifiRadio>>>,
    #[cfg(not(target_os = "espidf"))]
    sim: Mutex<SimState>,
}

#[cfg(not(target_os = "espidf"))]
struct SimState {
    /// Networks the simulated environment "sees".
    visible: Vec<NetworkRecord>,
    last_ssid: String,
}

impl WifiRadio {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(None),
            #[cfg(not(target_os = "espidf"))]
            sim: Mutex::new(SimState {
                visible: sim_default_networks(),
                last_ssid: String::new(),
            }),
        }
    }

    /// Register the notification handler.  Must be called before
    /// `bring_up`; notifications arriving earlier are dropped.
    pub fn attach_events(&self, events: LinkEvents<WifiRadio>) {
        *self
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(events);
    }

    fn deliver(&self, event: RadioEvent) {
        let guard = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(events) => events.handle(event),
            None => warn!("wifi: notification dropped, no handler attached"),
        }
    }
}

impl Default for WifiRadio {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF implementation
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod espidf_impl {
    use super::*;
    use core::ffi::c_void;
    use esp_idf_svc::sys::*;

    /// Context handed to the ESP event loop; owns a clone of the handler.
    pub(super) struct EventCtx {
        pub(super) events: LinkEvents<WifiRadio>,
    }

    pub(super) unsafe extern "C" fn wifi_event_trampoline(
        arg: *mut c_void,
        event_base: esp_event_base_t,
        event_id: i32,
        event_data: *mut c_void,
    ) {
        let ctx = unsafe { &*(arg as *const EventCtx) };

        if event_base == unsafe { WIFI_EVENT } {
            match event_id as u32 {
                wifi_event_t_WIFI_EVENT_STA_START => {
                    log::info!("wifi: station started");
                }
                wifi_event_t_WIFI_EVENT_STA_CONNECTED => {
                    ctx.events.handle(RadioEvent::LinkUp);
                }
                wifi_event_t_WIFI_EVENT_STA_DISCONNECTED => {
                    ctx.events.handle(RadioEvent::LinkDown);
                }
                wifi_event_t_WIFI_EVENT_SCAN_DONE => {
                    ctx.events.handle(RadioEvent::ScanComplete(collect_scan_records()));
                }
                _ => {}
            }
        } else if event_base == unsafe { IP_EVENT }
            && event_id as u32 == ip_event_t_IP_EVENT_STA_GOT_IP
        {
            let got = unsafe { &*(event_data as *const ip_event_got_ip_t) };
            let octets = got.ip_info.ip.addr.to_le_bytes();
            let mut ip = IpText::new();
            use core::fmt::Write;
            let _ = write!(ip, "{}.{}.{}.{}", octets[0], octets[1], octets[2], octets[3]);
            ctx.events.handle(RadioEvent::AddressAcquired(ip));
        }
    }

    /// Pull the AP records out of the driver after SCAN_DONE.
    fn collect_scan_records() -> Vec<NetworkRecord> {
        let mut count: u16 = 0;
        unsafe {
            if esp_wifi_scan_get_ap_num(&mut count) != ESP_OK as i32 {
                return Vec::new();
            }
        }
        if count == 0 {
            return Vec::new();
        }
        let mut raw = vec![wifi_ap_record_t::default(); count as usize];
        unsafe {
            if esp_wifi_scan_get_ap_records(&mut count, raw.as_mut_ptr()) != ESP_OK as i32 {
                return Vec::new();
            }
        }
        raw.truncate(count as usize);

        raw.iter()
            .filter_map(|rec| {
                let len = rec
                    .ssid
                    .iter()
                    .position(|&b| b == 0)
                    .unwrap_or(rec.ssid.len());
                let ssid = core::str::from_utf8(&rec.ssid[..len]).unwrap_or("");
                NetworkRecord::new(ssid, rec.rssi as i8, auth_mode_to_kind(rec.authmode))
            })
            .collect()
    }

    pub(super) fn auth_mode_to_kind(mode: wifi_auth_mode_t) -> SecurityKind {
        match mode {
            wifi_auth_mode_t_WIFI_AUTH_OPEN => SecurityKind::Open,
            wifi_auth_mode_t_WIFI_AUTH_WEP => SecurityKind::Wep,
            wifi_auth_mode_t_WIFI_AUTH_WPA_PSK => SecurityKind::Wpa,
            wifi_auth_mode_t_WIFI_AUTH_WPA2_PSK => SecurityKind::Wpa2,
            wifi_auth_mode_t_WIFI_AUTH_WPA_WPA2_PSK => SecurityKind::WpaWpa2,
            wifi_auth_mode_t_WIFI_AUTH_WPA3_PSK => SecurityKind::Wpa3,
            _ => SecurityKind::Unknown,
        }
    }
}

impl WifiRadio {
    #[cfg(target_os = "espidf")]
    fn platform_bring_up(&self) -> Result<(), &'static str> {
        use esp_idf_svc::sys::*;

        unsafe {
            let mut ret = nvs_flash_init();
            if ret == ESP_ERR_NVS_NO_FREE_PAGES as i32 || ret == ESP_ERR_NVS_NEW_VERSION_FOUND as i32 {
                if nvs_flash_erase() != ESP_OK as i32 {
                    return Err("NVS erase failed");
                }
                ret = nvs_flash_init();
            }
            if ret != ESP_OK as i32 {
                return Err("NVS init failed");
            }

            if esp_netif_init() != ESP_OK as i32 {
                return Err("netif init failed");
            }
            if esp_event_loop_create_default() != ESP_OK as i32 {
                return Err("event loop create failed");
            }
            esp_netif_create_default_wifi_sta();

            // The handler is boxed and leaked: it lives for the process
            // lifetime, exactly as long as the registration itself.
            let events = self
                .events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
                .ok_or("no event handler attached")?;
            let ctx = Box::into_raw(Box::new(espidf_impl::EventCtx { events }));

            if esp_event_handler_register(
                WIFI_EVENT,
                ESP_EVENT_ANY_ID,
                Some(espidf_impl::wifi_event_trampoline),
                ctx as *mut core::ffi::c_void,
            ) != ESP_OK as i32
            {
                return Err("WIFI_EVENT handler registration failed");
            }
            if esp_event_handler_register(
                IP_EVENT,
                ip_event_t_IP_EVENT_STA_GOT_IP as i32,
                Some(espidf_impl::wifi_event_trampoline),
                ctx as *mut core::ffi::c_void,
            ) != ESP_OK as i32
            {
                return Err("IP_EVENT handler registration failed");
            }

            let cfg = wifi_init_config_t::default();
            if esp_wifi_init(&cfg) != ESP_OK as i32 {
                return Err("WiFi init failed");
            }
            if esp_wifi_set_mode(wifi_mode_t_WIFI_MODE_STA) != ESP_OK as i32 {
                return Err("WiFi set mode failed");
            }
            if esp_wifi_start() != ESP_OK as i32 {
                return Err("WiFi start failed");
            }
        }
        info!("wifi: station interface up");
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_bring_up(&self) -> Result<(), &'static str> {
        info!("wifi(sim): station interface up");
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_request_scan(&self) -> Result<(), &'static str> {
        use esp_idf_svc::sys::*;
        let ret = unsafe { esp_wifi_scan_start(core::ptr::null(), false) };
        if ret == ESP_OK as i32 {
            Ok(())
        } else {
            Err("scan start failed")
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_request_scan(&self) -> Result<(), &'static str> {
        let visible = self
            .sim
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .visible
            .clone();
        self.deliver(RadioEvent::ScanComplete(visible));
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_request_connect(&self, ssid: &str, password: &str) -> Result<(), &'static str> {
        use esp_idf_svc::sys::*;

        let mut cfg = wifi_config_t::default();
        unsafe {
            let sta = &mut cfg.sta;
            let n = ssid.len().min(sta.ssid.len() - 1);
            sta.ssid[..n].copy_from_slice(&ssid.as_bytes()[..n]);
            let n = password.len().min(sta.password.len() - 1);
            sta.password[..n].copy_from_slice(&password.as_bytes()[..n]);
            sta.threshold.authmode = if password.is_empty() {
                wifi_auth_mode_t_WIFI_AUTH_OPEN
            } else {
                wifi_auth_mode_t_WIFI_AUTH_WPA2_PSK
            };
            sta.pmf_cfg.capable = true;
            sta.pmf_cfg.required = false;

            if esp_wifi_set_config(wifi_interface_t_WIFI_IF_STA, &mut cfg) != ESP_OK as i32 {
                return Err("set config failed");
            }
            if esp_wifi_connect() != ESP_OK as i32 {
                return Err("connect request failed");
            }
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_request_connect(&self, ssid: &str, _password: &str) -> Result<(), &'static str> {
        {
            let mut sim = self.sim.lock().unwrap_or_else(PoisonError::into_inner);
            sim.last_ssid = ssid.to_owned();
        }
        self.deliver(RadioEvent::LinkUp);
        let mut ip = IpText::new();
        let _ = ip.push_str("192.168.4.2");
        self.deliver(RadioEvent::AddressAcquired(ip));
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_request_reconnect(&self) -> Result<(), &'static str> {
        use esp_idf_svc::sys::*;
        // The driver keeps the last station config.
        let ret = unsafe { esp_wifi_connect() };
        if ret == ESP_OK as i32 {
            Ok(())
        } else {
            Err("reconnect request failed")
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_request_reconnect(&self) -> Result<(), &'static str> {
        let ssid = self
            .sim
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last_ssid
            .clone();
        info!("wifi(sim): reconnecting to '{}'", ssid);
        let mut ip = IpText::new();
        let _ = ip.push_str("192.168.4.2");
        self.deliver(RadioEvent::AddressAcquired(ip));
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_request_disconnect(&self) -> Result<(), &'static str> {
        use esp_idf_svc::sys::*;
        let ret = unsafe { esp_wifi_disconnect() };
        if ret == ESP_OK as i32 {
            Ok(())
        } else {
            Err("disconnect request failed")
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_request_disconnect(&self) -> Result<(), &'static str> {
        info!("wifi(sim): disconnected");
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_sta_rssi(&self) -> Option<i8> {
        use esp_idf_svc::sys::*;
        let mut rec = wifi_ap_record_t::default();
        let ret = unsafe { esp_wifi_sta_get_ap_info(&mut rec) };
        if ret == ESP_OK as i32 {
            Some(rec.rssi as i8)
        } else {
            None
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_sta_rssi(&self) -> Option<i8> {
        Some(-58)
    }
}

// ───────────────────────────────────────────────────────────────
// RadioPort
// ───────────────────────────────────────────────────────────────

impl RadioPort for WifiRadio {
    fn bring_up(&self) -> Result<(), &'static str> {
        self.platform_bring_up()
    }

    fn request_scan(&self) -> Result<(), &'static str> {
        self.platform_request_scan()
    }

    fn request_connect(&self, ssid: &str, password: &str) -> Result<(), &'static str> {
        self.platform_request_connect(ssid, password)
    }

    fn request_reconnect(&self) -> Result<(), &'static str> {
        self.platform_request_reconnect()
    }

    fn request_disconnect(&self) -> Result<(), &'static str> {
        self.platform_request_disconnect()
    }

    fn sta_rssi(&self) -> Option<i8> {
        self.platform_sta_rssi()
    }
}

// ───────────────────────────────────────────────────────────────
// Simulation environment
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
fn sim_default_networks() -> Vec<NetworkRecord> {
    [
        ("LabNet", -48, SecurityKind::Wpa2),
        ("Guest", -61, SecurityKind::Open),
        ("Workshop-5G", -55, SecurityKind::Wpa3),
    ]
    .into_iter()
    .filter_map(|(ssid, rssi, sec)| NetworkRecord::new(ssid, rssi, sec))
    .collect()
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
