//! WiFi link supervisor.
//!
//! [`LinkManager`] owns the connection state machine and exposes the
//! blocking scan/connect/disconnect operations the command router calls.
//! [`LinkEvents`] is the receive side: the radio adapter hands it every
//! asynchronous notification (scan-complete, link-up, link-down,
//! address-acquired), and it is the only code that signals a blocked
//! caller.
//!
//! ## Synchronization contract
//!
//! All mutable link state lives in one `Mutex<LinkInner>` behind an
//! `Arc<LinkShared>`, shared between the router thread and the radio
//! notification context.  `scan()` and `connect()` park on the condvar
//! with an explicit timeout; the event handlers mutate state and
//! `notify_all`.  No operation blocks indefinitely, and a second
//! scan/connect while one is outstanding is rejected, never queued.
//!
//! The event handler is constructed from the manager and carries the
//! `Arc` — the radio adapter registers it as its callback context, so no
//! global singleton is involved and multiple instances are safe.
//!
//! ## Retry policy
//!
//! On link-down the handler immediately re-issues the connect request —
//! there is deliberately no inter-attempt backoff (see DESIGN.md).  The
//! counter is bounded: when it reaches `max_connect_retries` consecutive
//! link-downs the state becomes `Failed` and nothing further is issued.

pub mod types;

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::app::ports::RadioPort;
use crate::config::SystemConfig;
use crate::error::{Error, LinkError, Result};

use types::{build_scan_list, IpText, LinkState, NetworkRecord, RadioEvent, Ssid};

// ───────────────────────────────────────────────────────────────
// Shared state container
// ───────────────────────────────────────────────────────────────

struct LinkInner {
    state: LinkState,
    networks: Vec<NetworkRecord>,
    /// Whether any scan has completed since boot (distinguishes "never
    /// scanned" from "scanned and found nothing").
    have_scan: bool,
    /// A scan request is outstanding.  Separate from `state` so a scan
    /// issued while `Connected` does not disturb the connection tag.
    scan_pending: bool,
    retry_count: u8,
    ip: IpText,
    initialized: bool,
}

struct LinkShared {
    inner: Mutex<LinkInner>,
    signal: Condvar,
}

impl LinkShared {
    fn lock(&self) -> MutexGuard<'_, LinkInner> {
        // Poisoned lock: take the guard anyway, the state stays usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ───────────────────────────────────────────────────────────────
// LinkManager — blocking operations (router side)
// ───────────────────────────────────────────────────────────────

pub struct LinkManager<R: RadioPort> {
    radio: Arc<R>,
    shared: Arc<LinkShared>,
    scan_timeout: Duration,
    connect_timeout: Duration,
    max_retries: u8,
    max_networks: usize,
}

impl<R: RadioPort> LinkManager<R> {
    pub fn new(radio: Arc<R>, config: &SystemConfig) -> Self {
        Self {
            radio,
            shared: Arc::new(LinkShared {
                inner: Mutex::new(LinkInner {
                    state: LinkState::Idle,
                    networks: Vec::new(),
                    have_scan: false,
                    scan_pending: false,
                    retry_count: 0,
                    ip: IpText::new(),
                    initialized: false,
                }),
                signal: Condvar::new(),
            }),
            scan_timeout: Duration::from_millis(u64::from(config.scan_timeout_ms)),
            connect_timeout: Duration::from_millis(u64::from(config.connect_timeout_ms)),
            max_retries: config.max_connect_retries,
            max_networks: config.max_scan_results,
        }
    }

    /// Handler handle for the radio adapter to call on every notification.
    pub fn event_handler(&self) -> LinkEvents<R> {
        LinkEvents {
            radio: Arc::clone(&self.radio),
            shared: Arc::clone(&self.shared),
            max_retries: self.max_retries,
            max_networks: self.max_networks,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// One-time bring-up of the underlying network capability.
    /// Idempotent: a second call is a no-op success.
    pub fn initialize(&self) -> Result<()> {
        if self.shared.lock().initialized {
            warn!("link: already initialized");
            return Ok(());
        }
        info!("link: bringing up radio");
        self.radio.bring_up().map_err(|msg| {
            error!("link: bring-up failed — {}", msg);
            Error::Init(msg)
        })?;
        self.shared.lock().initialized = true;
        info!("link: initialized");
        Ok(())
    }

    // ── Blocking operations ───────────────────────────────────

    /// Scan for networks.  Blocks the calling thread until the radio
    /// reports scan-complete or the timeout elapses.
    pub fn scan(&self) -> Result<Vec<NetworkRecord>> {
        {
            let mut g = self.shared.lock();
            if !g.initialized {
                return Err(LinkError::NotInitialized.into());
            }
            if g.scan_pending
                || matches!(
                    g.state,
                    LinkState::Connecting { .. } | LinkState::Retrying { .. }
                )
            {
                return Err(LinkError::Busy.into());
            }
            g.networks.clear();
            g.have_scan = false;
            g.scan_pending = true;
            if matches!(g.state, LinkState::Idle | LinkState::Failed { .. }) {
                g.state = LinkState::Scanning;
            }
        }

        info!("link: starting scan");
        if let Err(msg) = self.radio.request_scan() {
            let mut g = self.shared.lock();
            g.scan_pending = false;
            if g.state == LinkState::Scanning {
                g.state = LinkState::Idle;
            }
            error!("link: scan request rejected — {}", msg);
            return Err(LinkError::Driver(msg).into());
        }

        let g = self.shared.lock();
        let (mut g, _) = self
            .shared
            .signal
            .wait_timeout_while(g, self.scan_timeout, |i| i.scan_pending)
            .unwrap_or_else(PoisonError::into_inner);

        if g.scan_pending {
            g.scan_pending = false;
            if g.state == LinkState::Scanning {
                g.state = LinkState::Idle;
            }
            error!("link: scan timed out");
            return Err(LinkError::Timeout.into());
        }
        Ok(g.networks.clone())
    }

    /// Connect to `ssid`.  Blocks until the link is fully up, the radio
    /// reports permanent failure, or the timeout elapses.  On timeout the
    /// state is left wherever the event path last put it.
    pub fn connect(&self, ssid: &str, password: &str) -> Result<()> {
        if ssid.is_empty() {
            return Err(LinkError::EmptySsid.into());
        }
        let mut target = Ssid::new();
        target
            .push_str(ssid)
            .map_err(|_| Error::Link(LinkError::SsidTooLong))?;

        {
            let mut g = self.shared.lock();
            if !g.initialized {
                return Err(LinkError::NotInitialized.into());
            }
            match g.state {
                LinkState::Connecting { .. } | LinkState::Retrying { .. } => {
                    return Err(LinkError::Busy.into());
                }
                LinkState::Connected { .. } => {
                    return Err(LinkError::AlreadyConnected.into());
                }
                _ => {}
            }
            if g.scan_pending {
                return Err(LinkError::Busy.into());
            }
            g.retry_count = 0;
            g.ip.clear();
            g.state = LinkState::Connecting {
                target: target.clone(),
            };
        }

        info!("link: connecting to '{}'", ssid);
        if let Err(msg) = self.radio.request_connect(ssid, password) {
            self.shared.lock().state = LinkState::Idle;
            error!("link: connect request rejected — {}", msg);
            return Err(LinkError::Driver(msg).into());
        }

        let g = self.shared.lock();
        let (g, _) = self
            .shared
            .signal
            .wait_timeout_while(g, self.connect_timeout, |i| {
                !matches!(
                    i.state,
                    LinkState::Connected { .. } | LinkState::Failed { .. }
                )
            })
            .unwrap_or_else(PoisonError::into_inner);

        match &g.state {
            LinkState::Connected { .. } => {
                info!("link: connected to '{}' ({})", ssid, g.ip);
                Ok(())
            }
            LinkState::Failed { .. } => {
                error!("link: connection to '{}' failed", ssid);
                Err(LinkError::ConnectFailed.into())
            }
            _ => {
                warn!("link: connect to '{}' timed out", ssid);
                Err(LinkError::Timeout.into())
            }
        }
    }

    /// Drop the current association.  No-op success (`Ok(false)`) when the
    /// link is already down.
    pub fn disconnect(&self) -> Result<bool> {
        {
            let mut g = self.shared.lock();
            if !g.initialized {
                return Err(LinkError::NotInitialized.into());
            }
            match g.state {
                LinkState::Idle | LinkState::Scanning | LinkState::Failed { .. } => {
                    return Ok(false);
                }
                _ => {}
            }
            // Idle first: the disconnect request itself produces a
            // link-down notification, which must not trigger a retry.
            g.state = LinkState::Idle;
            g.retry_count = 0;
            g.ip.clear();
        }
        info!("link: disconnecting");
        self.radio.request_disconnect().map_err(|msg| {
            warn!("link: disconnect request rejected — {}", msg);
            Error::Link(LinkError::Driver(msg))
        })?;
        Ok(true)
    }

    // ── Non-blocking accessors ────────────────────────────────

    pub fn state(&self) -> LinkState {
        self.shared.lock().state.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.shared.lock().state.is_connected()
    }

    /// SSID of the current association, empty when not connected.
    pub fn connected_ssid(&self) -> String {
        match &self.shared.lock().state {
            LinkState::Connected { target } => target.as_str().to_owned(),
            _ => String::new(),
        }
    }

    /// Last-known address, empty when not connected.
    pub fn ip_address(&self) -> String {
        let g = self.shared.lock();
        if g.state.is_connected() {
            g.ip.as_str().to_owned()
        } else {
            String::new()
        }
    }

    /// Signal strength of the current association, 0 when not connected.
    pub fn rssi(&self) -> i8 {
        if self.is_connected() {
            self.radio.sta_rssi().unwrap_or(0)
        } else {
            0
        }
    }

    /// Results of the last completed scan; `None` when no scan has
    /// completed yet.
    pub fn networks(&self) -> Option<Vec<NetworkRecord>> {
        let g = self.shared.lock();
        g.have_scan.then(|| g.networks.clone())
    }

    pub fn retry_count(&self) -> u8 {
        self.shared.lock().retry_count
    }
}

// ───────────────────────────────────────────────────────────────
// LinkEvents — asynchronous notification handling (radio side)
// ───────────────────────────────────────────────────────────────

/// Receive side of the link supervisor.  The radio adapter holds one of
/// these and calls [`handle`](Self::handle) for every notification; it
/// runs concurrently with a blocked router thread and is the only
/// signaler of the condvar.
pub struct LinkEvents<R: RadioPort> {
    radio: Arc<R>,
    shared: Arc<LinkShared>,
    max_retries: u8,
    max_networks: usize,
}

impl<R: RadioPort> Clone for LinkEvents<R> {
    fn clone(&self) -> Self {
        Self {
            radio: Arc::clone(&self.radio),
            shared: Arc::clone(&self.shared),
            max_retries: self.max_retries,
            max_networks: self.max_networks,
        }
    }
}

impl<R: RadioPort> LinkEvents<R> {
    pub fn handle(&self, event: RadioEvent) {
        match event {
            RadioEvent::ScanComplete(raw) => self.on_scan_complete(raw),
            RadioEvent::LinkUp => {
                debug!("link: association up, waiting for address");
            }
            RadioEvent::AddressAcquired(ip) => self.on_address_acquired(ip),
            RadioEvent::LinkDown => self.on_link_down(),
        }
    }

    fn on_scan_complete(&self, raw: Vec<NetworkRecord>) {
        let list = build_scan_list(raw, self.max_networks);
        info!("link: scan complete — {} network(s)", list.len());
        let mut g = self.shared.lock();
        g.networks = list;
        g.have_scan = true;
        g.scan_pending = false;
        if g.state == LinkState::Scanning {
            g.state = LinkState::Idle;
        }
        self.shared.signal.notify_all();
    }

    fn on_address_acquired(&self, ip: IpText) {
        let mut g = self.shared.lock();
        match g.state.clone() {
            LinkState::Connecting { target } | LinkState::Retrying { target, .. } => {
                info!("link: got address {} on '{}'", ip, target);
                g.state = LinkState::Connected { target };
                g.retry_count = 0;
                g.ip = ip;
                self.shared.signal.notify_all();
            }
            LinkState::Connected { .. } => {
                // Lease renewal or re-assignment on an up link.
                g.ip = ip;
            }
            _ => {
                warn!("link: stray address notification in {} state", g.state.tag());
            }
        }
    }

    fn on_link_down(&self) {
        let mut g = self.shared.lock();
        let target = match g.state.clone() {
            LinkState::Connecting { target }
            | LinkState::Connected { target }
            | LinkState::Retrying { target, .. } => target,
            // Explicit disconnect or a stale notification: no retry.
            _ => return,
        };

        g.ip.clear();
        g.retry_count = g.retry_count.saturating_add(1);

        if g.retry_count >= self.max_retries {
            warn!(
                "link: giving up on '{}' after {} consecutive drops",
                target, g.retry_count
            );
            g.state = LinkState::Failed { target };
            self.shared.signal.notify_all();
            return;
        }

        let attempt = g.retry_count;
        g.state = LinkState::Retrying {
            target: target.clone(),
            attempt,
        };
        // The driver call must not run under the state lock.
        drop(g);

        info!(
            "link: link down, reconnect attempt {}/{}",
            attempt, self.max_retries
        );
        if let Err(msg) = self.radio.request_reconnect() {
            error!("link: reconnect request rejected — {}", msg);
            let mut g = self.shared.lock();
            g.state = LinkState::Failed { target };
            self.shared.signal.notify_all();
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
