//! Relay board pin adapter.
//!
//! Implements [`SwitchPort`] over two `embedded-hal` output pins, so the
//! same adapter drives real GPIOs on the device and plain fakes in host
//! tests.  Output levels are shadow-tracked: `OutputPin` has no read
//! path, and the relays are driven from exactly one place.

use embedded_hal::digital::OutputPin;
use log::debug;

use crate::app::ports::SwitchPort;
use crate::error::RelayError;
use crate::relay::RelayChannel;

pub struct RelayBoard<P1: OutputPin, P2: OutputPin> {
    relay_1: P1,
    relay_2: P2,
    levels: [bool; 2],
}

impl<P1: OutputPin, P2: OutputPin> RelayBoard<P1, P2> {
    pub fn new(relay_1: P1, relay_2: P2) -> Self {
        Self {
            relay_1,
            relay_2,
            levels: [false; 2],
        }
    }
}

impl<P1: OutputPin, P2: OutputPin> SwitchPort for RelayBoard<P1, P2> {
    fn drive(&mut self, channel: RelayChannel, on: bool) -> Result<(), RelayError> {
        let result = match (channel, on) {
            (RelayChannel::One, true) => self.relay_1.set_high().map_err(|_| RelayError::Driver("gpio write failed")),
            (RelayChannel::One, false) => self.relay_1.set_low().map_err(|_| RelayError::Driver("gpio write failed")),
            (RelayChannel::Two, true) => self.relay_2.set_high().map_err(|_| RelayError::Driver("gpio write failed")),
            (RelayChannel::Two, false) => self.relay_2.set_low().map_err(|_| RelayError::Driver("gpio write failed")),
        };
        result?;
        let idx = match channel {
            RelayChannel::One => 0,
            RelayChannel::Two => 1,
        };
        self.levels[idx] = on;
        debug!("relay_board: {} -> {}", channel.label(), if on { "HIGH" } else { "LOW" });
        Ok(())
    }

    fn level(&self, channel: RelayChannel) -> bool {
        match channel {
            RelayChannel::One => self.levels[0],
            RelayChannel::Two => self.levels[1],
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
