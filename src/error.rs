//! Unified error types for the netrelay firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! command router's error handling uniform: every failure becomes a value
//! that is rendered into exactly one response string.  Nothing in the
//! firmware unwinds — initialization failures abort startup, everything
//! after that is reported through command responses.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A subsystem's one-time bring-up failed.  Fatal during startup.
    Init(&'static str),
    /// Network link operation failed.
    Link(LinkError),
    /// Relay operation failed.
    Relay(RelayError),
    /// Secondary transport operation failed.
    Transport(TransportError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Link(e) => write!(f, "link: {e}"),
            Self::Relay(e) => write!(f, "relay: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Link errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// Operation requires `initialize()` to have succeeded first.
    NotInitialized,
    /// A scan or connect is already outstanding; requests are never queued.
    Busy,
    /// Connect was requested while a link is already up.
    AlreadyConnected,
    /// The target identifier is empty.
    EmptySsid,
    /// The target identifier exceeds the 32-byte SSID limit.
    SsidTooLong,
    /// The bounded wait elapsed without the expected radio notification.
    Timeout,
    /// The radio reported a permanent connection failure.
    ConnectFailed,
    /// The underlying radio driver rejected a request.
    Driver(&'static str),
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "not initialized"),
            Self::Busy => write!(f, "operation already in progress"),
            Self::AlreadyConnected => write!(f, "already connected"),
            Self::EmptySsid => write!(f, "SSID cannot be empty"),
            Self::SsidTooLong => write!(f, "SSID exceeds 32 bytes"),
            Self::Timeout => write!(f, "timed out"),
            Self::ConnectFailed => write!(f, "connection failed"),
            Self::Driver(msg) => write!(f, "driver: {msg}"),
        }
    }
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

// ---------------------------------------------------------------------------
// Relay errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayError {
    /// Operation requires `initialize()` to have succeeded first.
    NotInitialized,
    /// A pin write failed; the affected channel keeps its previous state.
    Driver(&'static str),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "not initialized"),
            Self::Driver(msg) => write!(f, "driver: {msg}"),
        }
    }
}

impl From<RelayError> for Error {
    fn from(e: RelayError) -> Self {
        Self::Relay(e)
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// No peer is connected; nothing to notify.
    NotConnected,
    /// The requested device name exceeds the 24-byte advertising limit.
    NameTooLong,
    /// The underlying stack rejected an advertise/notify/scan request.
    Driver(&'static str),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "no peer connected"),
            Self::NameTooLong => write!(f, "device name exceeds 24 bytes"),
            Self::Driver(msg) => write!(f, "driver: {msg}"),
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
