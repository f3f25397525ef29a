//! Command router tests: grammar, channel equivalence, and handler
//! behavior against the mock adapters.

use netrelay::app::router::{Invocation, Origin};
use netrelay::link::types::SecurityKind;
use netrelay::relay::{RelayChannel, RelayState};

use crate::mock_hw::{fixture, net, AutoReplies, Fixture, RadioRequest};

fn dispatch(f: &Fixture, origin: Origin, line: &str) -> String {
    f.router.dispatch(&Invocation::parse(line, origin))
}

fn con(f: &Fixture, line: &str) -> String {
    dispatch(f, Origin::Console, line)
}

fn scan_replies() -> AutoReplies {
    AutoReplies {
        scan: Some(vec![
            net("SecureNet", -40, SecurityKind::Wpa2),
            net("OpenCafe", -60, SecurityKind::Open),
        ]),
        connect_ip: Some("192.168.1.23"),
    }
}

// ── Grammar ───────────────────────────────────────────────────

#[test]
fn unknown_command_echoes_the_literal_token() {
    let f = fixture(AutoReplies::default());
    let reply = con(&f, "reboot now");
    assert!(reply.contains("Unknown command: 'reboot'"));
    assert!(reply.contains("help"));
}

#[test]
fn empty_input_yields_a_prompt_hint() {
    let f = fixture(AutoReplies::default());
    let reply = con(&f, "   ");
    assert!(reply.contains("help"));
}

#[test]
fn aliases_reach_the_same_handler() {
    let f = fixture(scan_replies());
    let long = con(&f, "list");
    let short = con(&f, "l");
    assert_eq!(long, short);
}

#[test]
fn help_lists_the_grammar() {
    let f = fixture(AutoReplies::default());
    let reply = con(&f, "help");
    for verb in ["scan", "connect", "ble_start", "relay_toggle"] {
        assert!(reply.contains(verb), "help is missing '{verb}'");
    }
    // Identical on both channels.
    assert_eq!(reply, dispatch(&f, Origin::Ble, "HELP"));
}

#[test]
fn missing_connect_args_yield_usage_not_a_crash() {
    let f = fixture(AutoReplies::default());
    let reply = con(&f, "connect");
    assert!(reply.contains("Usage: connect"));
    assert!(f.radio.request_log().is_empty());
}

// ── WiFi flows ────────────────────────────────────────────────

#[test]
fn list_before_scan_is_explicit() {
    let f = fixture(AutoReplies::default());
    let reply = con(&f, "list");
    assert!(reply.contains("Run 'scan' first"));
}

#[test]
fn scan_then_list_show_the_same_networks() {
    let f = fixture(scan_replies());
    let scan_reply = con(&f, "scan");
    assert!(scan_reply.contains("Found 2 network(s)"));
    assert!(scan_reply.contains("[0] SecureNet (WPA2, RSSI: -40 dBm)"));
    assert!(scan_reply.contains("[1] OpenCafe (Open, RSSI: -60 dBm)"));

    let list_reply = con(&f, "list");
    assert!(list_reply.contains("[0] SecureNet"));
    assert!(list_reply.contains("[1] OpenCafe"));
}

#[test]
fn connect_by_name_reports_address_and_signal() {
    let f = fixture(scan_replies());
    let reply = con(&f, "connect SecureNet password1");
    assert!(reply.contains("Connected to: SecureNet"));
    assert!(reply.contains("IP Address: 192.168.1.23"));
    assert!(reply.contains("Signal Strength: -47 dBm"));
    assert!(matches!(
        f.radio.request_log().last().unwrap(),
        RadioRequest::Connect { ssid, password }
            if ssid == "SecureNet" && password == "password1"
    ));
}

#[test]
fn connect_by_index_resolves_the_scanned_ssid() {
    let f = fixture(scan_replies());
    con(&f, "scan");
    let reply = con(&f, "connect 1");
    assert!(reply.contains("Connected to: OpenCafe"));
}

#[test]
fn connect_by_index_to_secured_network_needs_password() {
    let f = fixture(scan_replies());
    con(&f, "scan");
    let reply = con(&f, "connect 0");
    assert!(reply.contains("secured network"));
    // No request was issued.
    assert!(!f
        .radio
        .request_log()
        .iter()
        .any(|r| matches!(r, RadioRequest::Connect { .. })));

    let reply = con(&f, "connect 0 password1");
    assert!(reply.contains("Connected to: SecureNet"));
}

#[test]
fn connect_index_out_of_range_is_rejected() {
    let f = fixture(scan_replies());
    con(&f, "scan");
    let reply = con(&f, "connect 7");
    assert!(reply.contains("out of range"));
}

#[test]
fn connect_by_index_before_scan_is_rejected() {
    let f = fixture(scan_replies());
    let reply = con(&f, "connect 0");
    assert!(reply.contains("Run 'scan' first"));
}

#[test]
fn status_tracks_the_connection() {
    let f = fixture(scan_replies());
    assert!(con(&f, "status").contains("No active WiFi connection"));
    con(&f, "connect OpenCafe");
    let reply = con(&f, "st");
    assert!(reply.contains("State: Connected"));
    assert!(reply.contains("Network: OpenCafe"));
}

#[test]
fn disconnect_round_trip() {
    let f = fixture(scan_replies());
    assert!(con(&f, "disconnect").contains("Not connected"));
    con(&f, "connect OpenCafe");
    assert!(con(&f, "disconnect").contains("Disconnected from 'OpenCafe'"));
    assert!(con(&f, "status").contains("No active WiFi connection"));
}

// ── BLE flows ─────────────────────────────────────────────────

#[test]
fn ble_lifecycle_commands() {
    let f = fixture(AutoReplies::default());
    let reply = con(&f, "ble_start");
    assert!(reply.contains("BLE advertising started"));
    assert!(reply.contains("netrelay-p4"));

    let reply = con(&f, "bt");
    assert!(reply.contains("Advertising: Yes"));

    assert!(con(&f, "ble_stop").contains("stopped"));
}

#[test]
fn ble_name_applies_to_next_start() {
    let f = fixture(AutoReplies::default());
    assert!(con(&f, "ble_name lab-bridge").contains("lab-bridge"));
    con(&f, "ble_start");
    let guard = f.ble.lock().unwrap();
    assert_eq!(guard.device_name(), "lab-bridge");
}

#[test]
fn ble_scan_uses_fallback_on_bad_duration() {
    let f = fixture(AutoReplies::default());
    let reply = con(&f, "ble_scan 5s");
    assert!(reply.contains("Invalid duration format"));
    assert!(reply.contains("5 seconds"));
    // The documented fallback reached the adapter.
    let guard = f.ble.lock().unwrap();
    assert_eq!(guard.port().last_scan_secs, Some(5));
}

#[test]
fn ble_scan_clamps_out_of_range_duration() {
    let f = fixture(AutoReplies::default());
    let reply = con(&f, "ble_scan 300");
    assert!(reply.contains("Invalid duration"));
    assert!(reply.contains("for 5 seconds"));
}

#[test]
fn ble_debug_reports_counters() {
    let f = fixture(AutoReplies::default());
    let reply = con(&f, "ble_debug");
    assert!(reply.contains("Frames Sent: 0"));
    assert!(reply.contains("Fragment Size: 180"));
}

// ── Relay flows ───────────────────────────────────────────────

#[test]
fn relay_commands_default_to_all_channels() {
    let f = fixture(AutoReplies::default());
    let reply = con(&f, "relay_on");
    assert!(reply.contains("All relays set to ON"));
    let relays = f.relays.lock().unwrap();
    assert_eq!(relays.state(RelayChannel::One), RelayState::On);
    assert_eq!(relays.state(RelayChannel::Two), RelayState::On);
}

#[test]
fn relay_toggle_all_flips_mixed_states() {
    let f = fixture(AutoReplies::default());
    con(&f, "relay_on 1");
    let reply = con(&f, "relay_toggle");
    assert!(reply.contains("Relay 1: OFF, Relay 2: ON"));

    let relays = f.relays.lock().unwrap();
    assert_eq!(relays.state(RelayChannel::One), RelayState::Off);
    assert_eq!(relays.state(RelayChannel::Two), RelayState::On);
    assert_eq!(relays.switch_count(RelayChannel::One), 2);
    assert_eq!(relays.switch_count(RelayChannel::Two), 1);
}

#[test]
fn relay_argument_validation() {
    let f = fixture(AutoReplies::default());
    let reply = con(&f, "relay_on 3");
    assert!(reply.contains("Invalid relay '3'"));
    let relays = f.relays.lock().unwrap();
    assert_eq!(relays.state(RelayChannel::One), RelayState::Off);
}

#[test]
fn relay_status_and_debug_render_states() {
    let f = fixture(AutoReplies::default());
    con(&f, "relay_on 2");
    let status = con(&f, "relay_status");
    assert!(status.contains("Relay 1: OFF"));
    assert!(status.contains("Relay 2: ON"));
    let debug = con(&f, "relay_debug");
    assert!(debug.contains("1 switches"));
    assert!(debug.contains("Total operations: 1"));
}

// ── Channel equivalence ───────────────────────────────────────

#[test]
fn identical_tokens_mutate_identically_on_both_channels() {
    let script = ["relay_on 1", "relay_toggle", "connect OpenCafe", "disconnect"];

    let console = fixture(scan_replies());
    let ble = fixture(scan_replies());

    let mut console_replies = Vec::new();
    let mut ble_replies = Vec::new();
    for line in script {
        console_replies.push(dispatch(&console, Origin::Console, line));
        ble_replies.push(dispatch(&ble, Origin::Ble, line));
    }

    // Responses are rendered by the same handlers.
    assert_eq!(console_replies, ble_replies);

    // And the state mutations match exactly.
    assert_eq!(console.radio.request_log(), ble.radio.request_log());
    let cr = console.relays.lock().unwrap();
    let br = ble.relays.lock().unwrap();
    for ch in RelayChannel::ALL {
        assert_eq!(cr.state(ch), br.state(ch));
        assert_eq!(cr.switch_count(ch), br.switch_count(ch));
    }
    assert_eq!(cr.total_ops(), br.total_ops());
}
