//! Command verbs and alias resolution.
//!
//! The grammar is a closed set: every verb has a long and a short form,
//! resolved case-insensitively against the first token.  The same table
//! backs both input channels, so the two can never drift apart.

/// Every command the router understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Help,
    Scan,
    List,
    Connect,
    Status,
    Disconnect,
    BleStart,
    BleStop,
    BleStatus,
    BleName,
    BleScan,
    BleDebug,
    RelayOn,
    RelayOff,
    RelayToggle,
    RelayStatus,
    RelayDebug,
}

/// (long form, short form, verb) — the single source of truth for the
/// grammar.  Order here is the order `help` lists commands in.
const ALIASES: &[(&str, &str, Verb)] = &[
    ("help", "h", Verb::Help),
    ("scan", "s", Verb::Scan),
    ("list", "l", Verb::List),
    ("connect", "c", Verb::Connect),
    ("status", "st", Verb::Status),
    ("disconnect", "d", Verb::Disconnect),
    ("ble_start", "bs", Verb::BleStart),
    ("ble_stop", "bp", Verb::BleStop),
    ("ble_status", "bt", Verb::BleStatus),
    ("ble_name", "bn", Verb::BleName),
    ("ble_scan", "bsc", Verb::BleScan),
    ("ble_debug", "bd", Verb::BleDebug),
    ("relay_on", "ron", Verb::RelayOn),
    ("relay_off", "roff", Verb::RelayOff),
    ("relay_toggle", "rt", Verb::RelayToggle),
    ("relay_status", "rs", Verb::RelayStatus),
    ("relay_debug", "rd", Verb::RelayDebug),
];

impl Verb {
    /// Resolve the first token of a command line, case-insensitively.
    pub fn resolve(token: &str) -> Option<Self> {
        ALIASES
            .iter()
            .find(|(long, short, _)| {
                token.eq_ignore_ascii_case(long) || token.eq_ignore_ascii_case(short)
            })
            .map(|&(_, _, verb)| verb)
    }
}

/// Static command listing rendered by `help` on both channels.
pub fn help_text() -> String {
    let mut out = String::from("=== Available Commands ===\n");
    out.push_str("\n--- WiFi Commands ---\n");
    out.push_str("help, h                     - Show this help message\n");
    out.push_str("scan, s                     - Scan for available WiFi networks\n");
    out.push_str("list, l                     - List previously scanned networks\n");
    out.push_str("connect, c <ssid|idx> [pw]  - Connect by name or scan index\n");
    out.push_str("status, st                  - Show current connection status\n");
    out.push_str("disconnect, d               - Disconnect from current network\n");
    out.push_str("\n--- BLE Commands ---\n");
    out.push_str("ble_start, bs               - Start BLE advertising\n");
    out.push_str("ble_stop, bp                - Stop BLE advertising\n");
    out.push_str("ble_status, bt              - Show BLE status\n");
    out.push_str("ble_name, bn <name>         - Set BLE device name\n");
    out.push_str("ble_scan, bsc [duration]    - Scan for BLE devices (default: 5s)\n");
    out.push_str("ble_debug, bd               - Show detailed BLE debug info\n");
    out.push_str("\n--- Relay Commands ---\n");
    out.push_str("relay_on, ron [1|2|all]     - Switch relay(s) on (default: all)\n");
    out.push_str("relay_off, roff [1|2|all]   - Switch relay(s) off (default: all)\n");
    out.push_str("relay_toggle, rt [1|2|all]  - Toggle relay(s) (default: all)\n");
    out.push_str("relay_status, rs            - Show relay states\n");
    out.push_str("relay_debug, rd             - Show relay debug counters\n");
    out.push_str("\nCommands are available over USB serial and BLE.\n");
    out
}
