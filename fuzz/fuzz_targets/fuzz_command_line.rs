//! Fuzz target: `CommandRouter::dispatch`
//!
//! Drives arbitrary byte sequences through the line parser and router
//! against the simulation adapters and asserts that every input yields
//! exactly one response without panicking.
//!
//! cargo fuzz run fuzz_command_line

#![no_main]

use std::sync::{Arc, Mutex};

use libfuzzer_sys::fuzz_target;

use netrelay::adapters::ble::BleLink;
use netrelay::adapters::relay_board::RelayBoard;
use netrelay::adapters::wifi::WifiRadio;
use netrelay::app::router::{CommandRouter, Invocation, Origin};
use netrelay::config::SystemConfig;
use netrelay::link::LinkManager;
use netrelay::relay::RelayManager;
use netrelay::transport::CommandLink;

/// Inert embedded-hal pin for the relay seam.
struct NoopPin;

impl embedded_hal::digital::ErrorType for NoopPin {
    type Error = core::convert::Infallible;
}

impl embedded_hal::digital::OutputPin for NoopPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

fuzz_target!(|data: &[u8]| {
    let line = String::from_utf8_lossy(data);

    let config = SystemConfig {
        // The sim radio answers synchronously; keep the bound tight
        // anyway so a regression cannot hang the fuzzer.
        scan_timeout_ms: 50,
        connect_timeout_ms: 50,
        ..SystemConfig::default()
    };

    let radio = Arc::new(WifiRadio::new());
    let link = Arc::new(LinkManager::new(Arc::clone(&radio), &config));
    radio.attach_events(link.event_handler());
    link.initialize().unwrap();

    let mut relays = RelayManager::new(RelayBoard::new(NoopPin, NoopPin));
    relays.initialize().unwrap();
    let relays = Arc::new(Mutex::new(relays));

    let ble = Arc::new(Mutex::new(CommandLink::new(
        BleLink::new(),
        &config.ble_device_name,
        config.ble_fragment_bytes,
    )));

    let router = CommandRouter::new(link, relays, ble, &config);

    for origin in [Origin::Console, Origin::Ble] {
        let reply = router.dispatch(&Invocation::parse(&line, origin));
        assert!(!reply.is_empty(), "router must always produce a response");
    }
});
