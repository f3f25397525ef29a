//! netrelay — Main Entry Point
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                    │
//! │                                                              │
//! │  WifiRadio        BleLink         RelayBoard      Console    │
//! │  (RadioPort)      (NotifyPort)    (SwitchPort)    (stdio)    │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ──────────────────      │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────┐      │
//! │  │  LinkManager · RelayManager · CommandLink          │      │
//! │  │            CommandRouter (one grammar)             │      │
//! │  └────────────────────────────────────────────────────┘      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two dispatch contexts share the router: the interactive loop below and
//! the BLE pump thread.  Component bring-up is fatal-on-failure; anything
//! after that reports through command responses only.
#![deny(unused_must_use)]

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::Result;
use log::{error, info, warn};

use netrelay::adapters::ble::{self, BleLink};
use netrelay::adapters::console::Console;
use netrelay::adapters::relay_board::RelayBoard;
use netrelay::adapters::wifi::WifiRadio;
use netrelay::app::ports::{NotifyPort, RadioPort, SwitchPort};
use netrelay::app::router::{CommandRouter, Invocation, Origin};
use netrelay::config::SystemConfig;
use netrelay::link::LinkManager;
use netrelay::relay::RelayManager;
use netrelay::transport::CommandLink;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  netrelay v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = SystemConfig::default();

    // ── 2. Interactive console ────────────────────────────────
    let console = Console::new();
    if let Err(e) = console.setup() {
        error!("console setup failed: {} — halting", e);
        halt();
    }

    // ── 3. WiFi link ──────────────────────────────────────────
    let radio = Arc::new(WifiRadio::new());
    let link = Arc::new(LinkManager::new(Arc::clone(&radio), &config));
    radio.attach_events(link.event_handler());
    if let Err(e) = link.initialize() {
        // Network bring-up failure is critical — log and halt.  In
        // production the watchdog resets the board after timeout.
        error!("link init failed: {} — halting", e);
        halt();
    }

    // ── 4. Relay board ────────────────────────────────────────
    info!(
        "relay pins: relay 1 = GPIO{}, relay 2 = GPIO{}",
        netrelay::pins::RELAY_1_GPIO,
        netrelay::pins::RELAY_2_GPIO
    );
    let peripherals = esp_idf_hal::peripherals::Peripherals::take()?;
    let board = RelayBoard::new(
        esp_idf_hal::gpio::PinDriver::output(peripherals.pins.gpio32)?,
        esp_idf_hal::gpio::PinDriver::output(peripherals.pins.gpio46)?,
    );
    let mut relay_mgr = RelayManager::new(board);
    if let Err(e) = relay_mgr.initialize() {
        error!("relay init failed: {} — halting", e);
        halt();
    }
    let relays = Arc::new(Mutex::new(relay_mgr));

    // ── 5. BLE command link ───────────────────────────────────
    let ble_link = Arc::new(Mutex::new(CommandLink::new(
        BleLink::new(),
        &config.ble_device_name,
        config.ble_fragment_bytes,
    )));

    // ── 6. Router + BLE pump ──────────────────────────────────
    let router = CommandRouter::new(
        Arc::clone(&link),
        Arc::clone(&relays),
        Arc::clone(&ble_link),
        &config,
    );

    {
        let router = router.clone();
        let ble_link = Arc::clone(&ble_link);
        std::thread::Builder::new()
            .name("ble_pump".into())
            .stack_size(8 * 1024)
            .spawn(move || ble_pump(&router, &ble_link))?;
    }

    info!("system initialized");

    // ── 7. Interactive loop ───────────────────────────────────
    console.print_welcome();
    loop {
        console.print_prompt();
        let Some(line) = console.read_line() else {
            std::thread::sleep(Duration::from_millis(10));
            continue;
        };
        let inv = Invocation::parse(&line, Origin::Console);
        if inv.tokens.is_empty() {
            continue;
        }
        let reply = router.dispatch(&inv);
        console.print_response(&reply);
    }
}

/// Drain inbound BLE traffic: peer edges first, then complete command
/// lines.  The service lock is never held across a dispatch, so a BLE
/// command may block inside the link manager while the console stays
/// responsive.
fn ble_pump<R, S, N>(router: &CommandRouter<R, S, N>, ble_link: &Arc<Mutex<CommandLink<N>>>) -> !
where
    R: RadioPort,
    S: SwitchPort,
    N: NotifyPort,
{
    loop {
        if let Some(connected) = ble::take_peer_event() {
            let mut guard = ble_link.lock().unwrap_or_else(PoisonError::into_inner);
            if connected {
                guard.on_peer_connected();
            } else {
                guard.on_peer_disconnected();
            }
        }

        if let Some(data) = ble::take_rx_data() {
            let line = {
                let mut guard = ble_link.lock().unwrap_or_else(PoisonError::into_inner);
                guard.on_payload(&data);
                guard.take_inbound()
            };
            if let Some(line) = line {
                let reply = router.dispatch(&Invocation::parse(&line, Origin::Ble));
                let send = ble_link
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .send_response(&reply);
                if let Err(e) = send {
                    warn!("ble: response dropped — {}", e);
                }
            }
        }

        std::thread::sleep(Duration::from_millis(20));
    }
}

/// Park forever after a fatal bring-up failure.
fn halt() -> ! {
    #[allow(clippy::empty_loop)]
    loop {}
}
