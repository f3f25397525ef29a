//! Mock hardware adapters for integration tests.
//!
//! Records every driver request so tests can assert on the full call
//! history without touching a real radio, GPIO or BLE stack.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use netrelay::app::ports::{NotifyPort, PeerRecord, RadioPort, SwitchPort};
use netrelay::app::router::CommandRouter;
use netrelay::config::SystemConfig;
use netrelay::link::types::{IpText, NetworkRecord, RadioEvent, SecurityKind};
use netrelay::link::{LinkEvents, LinkManager};
use netrelay::relay::{RelayChannel, RelayManager};
use netrelay::transport::CommandLink;
use netrelay::{RelayError, TransportError};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Radio request record ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioRequest {
    Scan,
    Connect { ssid: String, password: String },
    Reconnect,
    Disconnect,
}

/// How the mock radio answers a request.
#[derive(Debug, Clone, Default)]
pub struct AutoReplies {
    /// Networks delivered synchronously on every scan request; `None`
    /// leaves the scan hanging (tests inject events by hand).
    pub scan: Option<Vec<NetworkRecord>>,
    /// Address delivered synchronously on every connect/reconnect
    /// request; `None` leaves the connect hanging.
    pub connect_ip: Option<&'static str>,
}

// ── MockRadio ─────────────────────────────────────────────────

pub struct MockRadio {
    pub requests: Mutex<Vec<RadioRequest>>,
    auto: Mutex<AutoReplies>,
    handler: Mutex<Option<LinkEvents<MockRadio>>>,
}

impl MockRadio {
    pub fn new(auto: AutoReplies) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            auto: Mutex::new(auto),
            handler: Mutex::new(None),
        })
    }

    pub fn attach(&self, handler: LinkEvents<MockRadio>) {
        *lock(&self.handler) = Some(handler);
    }

    /// Deliver a radio notification, as the driver's event context would.
    /// The handler is cloned out first so a handler-triggered reconnect
    /// can fire follow-up events through the same path.
    pub fn fire(&self, event: RadioEvent) {
        let handler = lock(&self.handler).clone().expect("handler not attached");
        handler.handle(event);
    }

    pub fn request_log(&self) -> Vec<RadioRequest> {
        lock(&self.requests).clone()
    }

    pub fn count_reconnects(&self) -> usize {
        lock(&self.requests)
            .iter()
            .filter(|r| matches!(r, RadioRequest::Reconnect))
            .count()
    }

    fn answer_connect(&self) {
        let ip_text = lock(&self.auto).connect_ip;
        if let Some(ip) = ip_text {
            let mut addr = IpText::new();
            addr.push_str(ip).unwrap();
            self.fire(RadioEvent::LinkUp);
            self.fire(RadioEvent::AddressAcquired(addr));
        }
    }
}

impl RadioPort for MockRadio {
    fn bring_up(&self) -> Result<(), &'static str> {
        Ok(())
    }

    fn request_scan(&self) -> Result<(), &'static str> {
        lock(&self.requests).push(RadioRequest::Scan);
        let nets = lock(&self.auto).scan.clone();
        if let Some(nets) = nets {
            self.fire(RadioEvent::ScanComplete(nets));
        }
        Ok(())
    }

    fn request_connect(&self, ssid: &str, password: &str) -> Result<(), &'static str> {
        lock(&self.requests).push(RadioRequest::Connect {
            ssid: ssid.to_owned(),
            password: password.to_owned(),
        });
        self.answer_connect();
        Ok(())
    }

    fn request_reconnect(&self) -> Result<(), &'static str> {
        lock(&self.requests).push(RadioRequest::Reconnect);
        self.answer_connect();
        Ok(())
    }

    fn request_disconnect(&self) -> Result<(), &'static str> {
        lock(&self.requests).push(RadioRequest::Disconnect);
        Ok(())
    }

    fn sta_rssi(&self) -> Option<i8> {
        Some(-47)
    }
}

// ── Mock relay pins ───────────────────────────────────────────

#[derive(Default)]
pub struct MockPins {
    pub levels: [bool; 2],
}

impl SwitchPort for MockPins {
    fn drive(&mut self, channel: RelayChannel, on: bool) -> Result<(), RelayError> {
        let idx = match channel {
            RelayChannel::One => 0,
            RelayChannel::Two => 1,
        };
        self.levels[idx] = on;
        Ok(())
    }

    fn level(&self, channel: RelayChannel) -> bool {
        let idx = match channel {
            RelayChannel::One => 0,
            RelayChannel::Two => 1,
        };
        self.levels[idx]
    }
}

// ── Mock BLE notify port ──────────────────────────────────────

#[derive(Default)]
pub struct MockNotify {
    pub connected: bool,
    pub advertised_names: Vec<String>,
    pub sent: Vec<Vec<u8>>,
    pub peers: Vec<PeerRecord>,
    pub last_scan_secs: Option<u32>,
}

impl NotifyPort for MockNotify {
    fn start_advertising(&mut self, name: &str) -> Result<(), TransportError> {
        self.advertised_names.push(name.to_owned());
        Ok(())
    }

    fn stop_advertising(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn notify(&mut self, fragment: &[u8]) -> Result<(), TransportError> {
        self.sent.push(fragment.to_vec());
        Ok(())
    }

    fn scan_peers(&mut self, duration_secs: u32) -> Result<Vec<PeerRecord>, TransportError> {
        self.last_scan_secs = Some(duration_secs);
        Ok(self.peers.clone())
    }
}

// ── Fixture ───────────────────────────────────────────────────

pub type TestRouter = CommandRouter<MockRadio, MockPins, MockNotify>;

pub struct Fixture {
    pub radio: Arc<MockRadio>,
    pub link: Arc<LinkManager<MockRadio>>,
    pub relays: Arc<Mutex<RelayManager<MockPins>>>,
    pub ble: Arc<Mutex<CommandLink<MockNotify>>>,
    pub router: TestRouter,
}

/// Convenience records for auto-scan replies.
pub fn net(ssid: &str, rssi: i8, security: SecurityKind) -> NetworkRecord {
    NetworkRecord::new(ssid, rssi, security).unwrap()
}

/// Config with short timeouts so blocked waits resolve quickly on the host.
pub fn fast_config() -> SystemConfig {
    SystemConfig {
        scan_timeout_ms: 100,
        connect_timeout_ms: 100,
        ..SystemConfig::default()
    }
}

pub fn fixture(auto: AutoReplies) -> Fixture {
    fixture_with_config(auto, fast_config())
}

pub fn fixture_with_config(auto: AutoReplies, config: SystemConfig) -> Fixture {
    let radio = MockRadio::new(auto);
    let link = Arc::new(LinkManager::new(Arc::clone(&radio), &config));
    radio.attach(link.event_handler());
    link.initialize().unwrap();

    let mut relay_mgr = RelayManager::new(MockPins::default());
    relay_mgr.initialize().unwrap();
    let relays = Arc::new(Mutex::new(relay_mgr));

    let mut notify = MockNotify::default();
    // A peer is attached in most flows; tests flip this off when needed.
    notify.connected = true;
    let ble = Arc::new(Mutex::new(CommandLink::new(
        notify,
        &config.ble_device_name,
        config.ble_fragment_bytes,
    )));

    let router = CommandRouter::new(
        Arc::clone(&link),
        Arc::clone(&relays),
        Arc::clone(&ble),
        &config,
    );

    Fixture {
        radio,
        link,
        relays,
        ble,
        router,
    }
}
