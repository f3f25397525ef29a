//! Command router.
//!
//! One grammar, two channels: the interactive serial console and the BLE
//! command link both feed lines into [`CommandRouter::dispatch`].  Every
//! verb has exactly one handler that performs the state changes and
//! renders one response string; the channels differ only in how that
//! string is delivered (printed vs. fragmented over BLE).
//!
//! The router itself is stateless — it holds shared handles to the
//! managers, so both channels may have a dispatch in flight at the same
//! time.  A dispatch may block inside `LinkManager::scan`/`connect` for
//! up to the configured timeout; it always produces a response.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;

use crate::app::args::parse_decimal;
use crate::app::ports::{NotifyPort, RadioPort, SwitchPort};
use crate::app::verbs::{help_text, Verb};
use crate::config::SystemConfig;
use crate::error::{Error, LinkError};
use crate::link::types::{LinkState, NetworkRecord};
use crate::link::LinkManager;
use crate::relay::{RelayChannel, RelayManager, RelaySelector, RelayState};
use crate::transport::CommandLink;

// ───────────────────────────────────────────────────────────────
// Invocations
// ───────────────────────────────────────────────────────────────

/// Which channel a command arrived on.  Affects delivery only — never
/// the state changes a command performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Console,
    Ble,
}

/// A tokenized command line plus its origin.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub tokens: Vec<String>,
    pub origin: Origin,
}

impl Invocation {
    pub fn parse(line: &str, origin: Origin) -> Self {
        Self {
            tokens: parse_line(line),
            origin,
        }
    }
}

/// Split a command line on ASCII whitespace.  No quoting, no escaping;
/// empty input yields no tokens.
pub fn parse_line(text: &str) -> Vec<String> {
    text.split_ascii_whitespace().map(str::to_owned).collect()
}

// ───────────────────────────────────────────────────────────────
// CommandRouter
// ───────────────────────────────────────────────────────────────

pub struct CommandRouter<R: RadioPort, S: SwitchPort, N: NotifyPort> {
    link: Arc<LinkManager<R>>,
    relays: Arc<Mutex<RelayManager<S>>>,
    ble: Arc<Mutex<CommandLink<N>>>,
    ble_scan_default_secs: u32,
    ble_scan_max_secs: u32,
}

impl<R: RadioPort, S: SwitchPort, N: NotifyPort> Clone for CommandRouter<R, S, N> {
    fn clone(&self) -> Self {
        Self {
            link: Arc::clone(&self.link),
            relays: Arc::clone(&self.relays),
            ble: Arc::clone(&self.ble),
            ble_scan_default_secs: self.ble_scan_default_secs,
            ble_scan_max_secs: self.ble_scan_max_secs,
        }
    }
}

impl<R: RadioPort, S: SwitchPort, N: NotifyPort> CommandRouter<R, S, N> {
    pub fn new(
        link: Arc<LinkManager<R>>,
        relays: Arc<Mutex<RelayManager<S>>>,
        ble: Arc<Mutex<CommandLink<N>>>,
        config: &SystemConfig,
    ) -> Self {
        Self {
            link,
            relays,
            ble,
            ble_scan_default_secs: config.ble_scan_default_secs,
            ble_scan_max_secs: config.ble_scan_max_secs,
        }
    }

    fn relays(&self) -> MutexGuard<'_, RelayManager<S>> {
        self.relays.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ble(&self) -> MutexGuard<'_, CommandLink<N>> {
        self.ble.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolve and execute one command.  Every path yields exactly one
    /// response string.
    pub fn dispatch(&self, inv: &Invocation) -> String {
        let Some(first) = inv.tokens.first() else {
            return "Enter a command. Type 'help' for available commands.".to_owned();
        };
        debug!("cmd({:?}): {:?}", inv.origin, inv.tokens);
        match Verb::resolve(first) {
            None => format!(
                "Unknown command: '{}'. Type 'help' for available commands.",
                first
            ),
            Some(Verb::Help) => help_text(),
            Some(Verb::Scan) => self.handle_scan(),
            Some(Verb::List) => self.handle_list(),
            Some(Verb::Connect) => self.handle_connect(&inv.tokens),
            Some(Verb::Status) => self.handle_status(),
            Some(Verb::Disconnect) => self.handle_disconnect(),
            Some(Verb::BleStart) => self.handle_ble_start(),
            Some(Verb::BleStop) => self.handle_ble_stop(),
            Some(Verb::BleStatus) => self.handle_ble_status(),
            Some(Verb::BleName) => self.handle_ble_name(&inv.tokens),
            Some(Verb::BleScan) => self.handle_ble_scan(&inv.tokens),
            Some(Verb::BleDebug) => self.handle_ble_debug(),
            Some(Verb::RelayOn) => self.handle_relay_set(&inv.tokens, RelayState::On),
            Some(Verb::RelayOff) => self.handle_relay_set(&inv.tokens, RelayState::Off),
            Some(Verb::RelayToggle) => self.handle_relay_toggle(&inv.tokens),
            Some(Verb::RelayStatus) => self.relays().status_text(),
            Some(Verb::RelayDebug) => self.relays().debug_text(),
        }
    }

    // ── WiFi handlers ─────────────────────────────────────────

    fn handle_scan(&self) -> String {
        match self.link.scan() {
            Ok(nets) if nets.is_empty() => "No networks found.".to_owned(),
            Ok(nets) => format!(
                "Scan completed. Found {} network(s):\n\n{}\nUse 'connect <index>' to join a network.",
                nets.len(),
                format_network_list(&nets)
            ),
            Err(Error::Link(e)) => format!("Failed to scan networks: {e}."),
            Err(e) => format!("Failed to scan networks: {e}."),
        }
    }

    fn handle_list(&self) -> String {
        match self.link.networks() {
            None => "No networks available. Run 'scan' first.".to_owned(),
            Some(nets) if nets.is_empty() => {
                "No networks found. Run 'scan' to search again.".to_owned()
            }
            Some(nets) => format!(
                "Previously scanned networks:\n\n{}\nUse 'connect <index>' to join a network.",
                format_network_list(&nets)
            ),
        }
    }

    fn handle_connect(&self, tokens: &[String]) -> String {
        let Some(first_arg) = tokens.get(1) else {
            return "Usage: connect <ssid|index> [password]\n\
                    Example: connect MyNetwork MyPassword\n\
                    Use 'list' to see scan indices."
                .to_owned();
        };
        let password = tokens.get(2).map_or("", String::as_str);

        // An all-digit first argument selects a network from the last scan.
        let ssid = if let Some(index) = parse_decimal(first_arg) {
            let Some(nets) = self.link.networks() else {
                return "No networks available. Run 'scan' first.".to_owned();
            };
            let Some(net) = nets.get(index as usize) else {
                return "Network index out of range. Use 'list' to see available networks."
                    .to_owned();
            };
            if net.security.requires_password() && password.is_empty() {
                return format!(
                    "'{}' is a secured network ({}). Usage: connect {} <password>",
                    net.ssid,
                    net.security.label(),
                    index
                );
            }
            net.ssid.as_str().to_owned()
        } else {
            first_arg.clone()
        };

        match self.link.connect(&ssid, password) {
            Ok(()) => format!(
                "=== Connection Successful ===\n\
                 Connected to: {}\n\
                 IP Address: {}\n\
                 Signal Strength: {} dBm",
                ssid,
                self.link.ip_address(),
                self.link.rssi()
            ),
            Err(Error::Link(LinkError::Timeout)) => {
                format!("Connection timeout for '{ssid}'.")
            }
            Err(Error::Link(LinkError::AlreadyConnected)) => {
                "Already connected. Use 'disconnect' first.".to_owned()
            }
            Err(Error::Link(LinkError::Busy)) => {
                "Another scan or connect is in progress.".to_owned()
            }
            Err(Error::Link(LinkError::EmptySsid | LinkError::SsidTooLong)) => {
                "Invalid SSID.".to_owned()
            }
            Err(e) => format!(
                "Failed to connect to '{ssid}': {e}.\nCheck the network name and password."
            ),
        }
    }

    fn handle_status(&self) -> String {
        let state = self.link.state();
        let mut out = String::from("=== Connection Status ===\n");
        out.push_str(&format!("State: {}\n", state.tag()));
        match &state {
            LinkState::Connected { target } => {
                out.push_str(&format!("Network: {target}\n"));
                out.push_str(&format!("IP Address: {}\n", self.link.ip_address()));
                out.push_str(&format!("Signal Strength: {} dBm", self.link.rssi()));
            }
            LinkState::Retrying { target, attempt } => {
                out.push_str(&format!(
                    "Reconnecting to '{target}' (attempt {attempt})"
                ));
            }
            LinkState::Connecting { target } => {
                out.push_str(&format!("Connecting to '{target}'"));
            }
            LinkState::Failed { target } => {
                out.push_str(&format!("Connection to '{target}' failed"));
            }
            LinkState::Idle | LinkState::Scanning => {
                out.push_str("No active WiFi connection.");
            }
        }
        out
    }

    fn handle_disconnect(&self) -> String {
        if !self.link.is_connected() {
            return "Not connected to any network.".to_owned();
        }
        let ssid = self.link.connected_ssid();
        match self.link.disconnect() {
            Ok(_) => format!("Disconnected from '{ssid}'."),
            Err(e) => format!("Failed to disconnect from '{ssid}': {e}."),
        }
    }

    // ── BLE handlers ──────────────────────────────────────────

    fn handle_ble_start(&self) -> String {
        let mut ble = self.ble();
        match ble.start() {
            Ok(()) => format!(
                "BLE advertising started.\n\
                 Device name: {}\n\
                 Connect with a BLE UART app to issue commands.",
                ble.device_name()
            ),
            Err(e) => format!("Failed to start BLE advertising: {e}."),
        }
    }

    fn handle_ble_stop(&self) -> String {
        match self.ble().stop() {
            Ok(()) => "BLE advertising stopped.".to_owned(),
            Err(e) => format!("Failed to stop BLE advertising: {e}."),
        }
    }

    fn handle_ble_status(&self) -> String {
        let ble = self.ble();
        format!(
            "=== BLE Status ===\n\
             Device Name: {}\n\
             Advertising: {}\n\
             Peer Connected: {}\n\
             Fragment Size: {} bytes\n\
             Use 'ble_debug' for detailed info.",
            ble.device_name(),
            if ble.is_advertising() { "Yes" } else { "No" },
            if ble.is_connected() { "Yes" } else { "No" },
            ble.fragment_bytes()
        )
    }

    fn handle_ble_name(&self, tokens: &[String]) -> String {
        let Some(name) = tokens.get(1) else {
            return "Usage: ble_name <device_name>\nExample: ble_name netrelay-lab".to_owned();
        };
        match self.ble().set_device_name(name) {
            Ok(()) => format!(
                "BLE device name set to: {name}\n\
                 Takes effect on the next advertising start."
            ),
            Err(e) => format!("Failed to set BLE device name: {e}."),
        }
    }

    fn handle_ble_scan(&self, tokens: &[String]) -> String {
        let mut out = String::new();
        let duration = match tokens.get(1) {
            None => self.ble_scan_default_secs,
            Some(arg) => match parse_decimal(arg) {
                None => {
                    out.push_str(&format!(
                        "Invalid duration format. Using default {} seconds.\n",
                        self.ble_scan_default_secs
                    ));
                    self.ble_scan_default_secs
                }
                Some(d) if d < 1 || d > self.ble_scan_max_secs => {
                    out.push_str(&format!(
                        "Invalid duration. Using default {} seconds.\n",
                        self.ble_scan_default_secs
                    ));
                    self.ble_scan_default_secs
                }
                Some(d) => d,
            },
        };

        out.push_str(&format!("Starting BLE scan for {duration} seconds...\n"));
        match self.ble().scan_peers(duration) {
            Ok(peers) if peers.is_empty() => out.push_str("No BLE devices found."),
            Ok(peers) => {
                out.push_str(&format!("Scan completed. Found {} device(s):\n", peers.len()));
                for p in &peers {
                    out.push_str(&format!("  {} (RSSI: {} dBm)\n", p.name, p.rssi));
                }
            }
            Err(e) => out.push_str(&format!("Failed to scan for BLE devices: {e}.")),
        }
        out
    }

    fn handle_ble_debug(&self) -> String {
        let ble = self.ble();
        format!(
            "=== BLE Debug Status ===\n\
             Device Name: {}\n\
             Advertising: {}\n\
             Peer Connected: {}\n\
             Fragment Size: {} bytes\n\
             Frames Sent: {}\n\
             Bytes Sent: {}",
            ble.device_name(),
            if ble.is_advertising() { "Yes" } else { "No" },
            if ble.is_connected() { "Yes" } else { "No" },
            ble.fragment_bytes(),
            ble.frames_sent(),
            ble.bytes_sent()
        )
    }

    // ── Relay handlers ────────────────────────────────────────

    fn handle_relay_set(&self, tokens: &[String], state: RelayState) -> String {
        let selector = match parse_selector(tokens.get(1)) {
            Ok(sel) => sel,
            Err(usage) => return usage,
        };
        let mut relays = self.relays();
        match relays.set_state(selector, state) {
            Ok(()) => format!(
                "{} set to {}.\n{}",
                selector.label(),
                state.label(),
                relay_states_line(&relays)
            ),
            Err(e) => format!("Relay operation failed: {e}."),
        }
    }

    fn handle_relay_toggle(&self, tokens: &[String]) -> String {
        let selector = match parse_selector(tokens.get(1)) {
            Ok(sel) => sel,
            Err(usage) => return usage,
        };
        let mut relays = self.relays();
        match relays.toggle(selector) {
            Ok(()) => format!("{} toggled.\n{}", selector.label(), relay_states_line(&relays)),
            Err(e) => format!("Relay operation failed: {e}."),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Rendering helpers
// ───────────────────────────────────────────────────────────────

fn format_network_list(nets: &[NetworkRecord]) -> String {
    let mut out = String::new();
    for (i, net) in nets.iter().enumerate() {
        out.push_str(&format!(
            "  [{i}] {} ({}, RSSI: {} dBm)\n",
            net.ssid,
            net.security.label(),
            net.rssi
        ));
    }
    out
}

fn relay_states_line<S: SwitchPort>(relays: &RelayManager<S>) -> String {
    format!(
        "Relay 1: {}, Relay 2: {}",
        relays.state(RelayChannel::One).label(),
        relays.state(RelayChannel::Two).label()
    )
}

/// Relay argument: `1`, `2` or `all` (default `all`).
fn parse_selector(arg: Option<&String>) -> core::result::Result<RelaySelector, String> {
    match arg.map(String::as_str) {
        None => Ok(RelaySelector::All),
        Some(a) if a.eq_ignore_ascii_case("all") => Ok(RelaySelector::All),
        Some("1") => Ok(RelaySelector::Single(RelayChannel::One)),
        Some("2") => Ok(RelaySelector::Single(RelayChannel::Two)),
        Some(other) => Err(format!(
            "Invalid relay '{other}'. Usage: relay_on|relay_off|relay_toggle [1|2|all]"
        )),
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
