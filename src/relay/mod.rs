//! Relay control.
//!
//! [`RelayManager`] owns the per-channel state and bookkeeping for the
//! dual relay board and drives the pins through the
//! [`SwitchPort`](crate::app::ports::SwitchPort) seam.  Operations are
//! synchronous and non-blocking; the manager is wrapped in a mutex by the
//! router when two channels may reach it.
//!
//! Safety invariant: every channel is forced Off at teardown, whatever
//! was last commanded.

use core::fmt::Write as _;

use log::{error, info, warn};

use crate::app::ports::SwitchPort;
use crate::error::{RelayError, Result};

// ───────────────────────────────────────────────────────────────
// Channel identifiers and state
// ───────────────────────────────────────────────────────────────

/// One physical relay channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayChannel {
    One,
    Two,
}

impl RelayChannel {
    pub const ALL: [Self; 2] = [Self::One, Self::Two];

    const fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::One => "Relay 1",
            Self::Two => "Relay 2",
        }
    }
}

/// Command target: one channel or every channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelaySelector {
    Single(RelayChannel),
    All,
}

impl RelaySelector {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Single(ch) => ch.label(),
            Self::All => "All relays",
        }
    }

    fn channels(self) -> &'static [RelayChannel] {
        match self {
            Self::Single(RelayChannel::One) => &[RelayChannel::One],
            Self::Single(RelayChannel::Two) => &[RelayChannel::Two],
            Self::All => &RelayChannel::ALL,
        }
    }
}

/// Commanded state of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    On,
    Off,
}

impl RelayState {
    pub const fn label(self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
        }
    }

    const fn complement(self) -> Self {
        match self {
            Self::On => Self::Off,
            Self::Off => Self::On,
        }
    }

    const fn as_level(self) -> bool {
        matches!(self, Self::On)
    }
}

#[derive(Debug, Clone, Copy)]
struct ChannelStats {
    state: RelayState,
    switch_count: u32,
}

// ───────────────────────────────────────────────────────────────
// RelayManager
// ───────────────────────────────────────────────────────────────

pub struct RelayManager<S: SwitchPort> {
    pins: S,
    initialized: bool,
    channels: [ChannelStats; 2],
    total_ops: u32,
}

impl<S: SwitchPort> RelayManager<S> {
    pub fn new(pins: S) -> Self {
        Self {
            pins,
            initialized: false,
            channels: [ChannelStats {
                state: RelayState::Off,
                switch_count: 0,
            }; 2],
            total_ops: 0,
        }
    }

    /// Drive every channel Off and reset bookkeeping.  Idempotent.
    pub fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            warn!("relay: already initialized");
            return Ok(());
        }
        info!("relay: initializing dual relay board");
        for ch in RelayChannel::ALL {
            self.pins.drive(ch, false)?;
        }
        self.channels = [ChannelStats {
            state: RelayState::Off,
            switch_count: 0,
        }; 2];
        self.total_ops = 0;
        self.initialized = true;
        info!("relay: all channels initialized to OFF");
        Ok(())
    }

    // ── Mutations ─────────────────────────────────────────────

    /// Set one channel or all channels.  With `All`, a failing channel is
    /// skipped and its siblings are still attempted; the aggregate result
    /// is the AND of the individual results.
    pub fn set_state(&mut self, selector: RelaySelector, state: RelayState) -> Result<()> {
        if !self.initialized {
            return Err(RelayError::NotInitialized.into());
        }
        let mut first_err = None;
        for &ch in selector.channels() {
            if let Err(e) = self.drive_channel(ch, state) {
                error!("relay: {} failed — {}", ch.label(), e);
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => {
                info!("relay: {} set to {}", selector.label(), state.label());
                Ok(())
            }
        }
    }

    /// Toggle one channel or all channels; each channel flips to the
    /// complement of its own current state.
    pub fn toggle(&mut self, selector: RelaySelector) -> Result<()> {
        if !self.initialized {
            return Err(RelayError::NotInitialized.into());
        }
        let mut first_err = None;
        for &ch in selector.channels() {
            let next = self.channels[ch.index()].state.complement();
            if let Err(e) = self.drive_channel(ch, next) {
                error!("relay: toggle {} failed — {}", ch.label(), e);
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Force every channel Off (teardown / safety path).
    pub fn shutdown(&mut self) {
        if !self.initialized {
            return;
        }
        if self.set_state(RelaySelector::All, RelayState::Off).is_err() {
            error!("relay: shutdown could not drive every channel off");
        }
    }

    fn drive_channel(&mut self, ch: RelayChannel, state: RelayState) -> Result<()> {
        self.total_ops = self.total_ops.wrapping_add(1);
        self.pins.drive(ch, state.as_level())?;
        let stats = &mut self.channels[ch.index()];
        if stats.state != state {
            stats.switch_count = stats.switch_count.wrapping_add(1);
        }
        stats.state = state;
        Ok(())
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn state(&self, ch: RelayChannel) -> RelayState {
        if !self.initialized {
            return RelayState::Off;
        }
        self.channels[ch.index()].state
    }

    pub fn switch_count(&self, ch: RelayChannel) -> u32 {
        self.channels[ch.index()].switch_count
    }

    pub fn total_ops(&self) -> u32 {
        self.total_ops
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    // ── Renderings ────────────────────────────────────────────

    pub fn status_text(&self) -> String {
        if !self.initialized {
            return String::from("Relay manager: not initialized");
        }
        let mut out = String::from("=== Relay Status ===\n");
        for ch in RelayChannel::ALL {
            let _ = writeln!(out, "{}: {}", ch.label(), self.state(ch).label());
        }
        out
    }

    pub fn debug_text(&self) -> String {
        let mut out = String::from("=== Relay Debug Status ===\n");
        let _ = writeln!(
            out,
            "Initialized: {}",
            if self.initialized { "Yes" } else { "No" }
        );
        if self.initialized {
            out.push_str("\nChannel states:\n");
            for ch in RelayChannel::ALL {
                let _ = writeln!(
                    out,
                    "- {}: {} ({} switches)",
                    ch.label(),
                    self.state(ch).label(),
                    self.switch_count(ch)
                );
            }
            let _ = writeln!(out, "\nTotal operations: {}", self.total_ops);
            out.push_str("Auto-off on teardown: enabled\n");
        }
        out
    }
}

impl<S: SwitchPort> Drop for RelayManager<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
