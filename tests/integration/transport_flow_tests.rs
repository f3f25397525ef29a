//! End-to-end BLE console flows: inbound payload → dispatch → fragmented
//! response, and the re-advertising path.

use netrelay::app::router::{Invocation, Origin};
use netrelay::config::SystemConfig;
use netrelay::transport::fragments;

use crate::mock_hw::{fixture_with_config, AutoReplies, Fixture};

fn small_fragment_config() -> SystemConfig {
    SystemConfig {
        scan_timeout_ms: 100,
        connect_timeout_ms: 100,
        ble_fragment_bytes: 16,
        ..SystemConfig::default()
    }
}

/// Run one inbound payload through the same path the BLE pump uses.
fn ble_round_trip(f: &Fixture, payload: &[u8]) -> String {
    let line = {
        let mut guard = f.ble.lock().unwrap();
        guard.on_payload(payload);
        guard.take_inbound()
    };
    let line = line.expect("payload should yield a command line");
    let reply = f.router.dispatch(&Invocation::parse(&line, Origin::Ble));
    f.ble.lock().unwrap().send_response(&reply).unwrap();
    reply
}

#[test]
fn inbound_command_produces_ordered_fragments() {
    let f = fixture_with_config(AutoReplies::default(), small_fragment_config());
    let reply = ble_round_trip(&f, b"help\r\n");

    let guard = f.ble.lock().unwrap();
    let sent = &guard.port().sent;
    // The help text does not fit one fragment.
    assert!(sent.len() > 1);
    assert!(sent.iter().all(|frag| frag.len() <= 16));

    // In-order concatenation reproduces the response exactly.
    let joined: Vec<u8> = sent.concat();
    assert_eq!(joined, reply.as_bytes());
}

#[test]
fn short_reply_is_a_single_fragment() {
    // Default fragment size (180 bytes) comfortably fits a status reply.
    let f = crate::mock_hw::fixture(AutoReplies::default());
    let reply = ble_round_trip(&f, b"status");
    let guard = f.ble.lock().unwrap();
    assert_eq!(guard.port().sent.len(), 1);
    assert_eq!(guard.port().sent[0], reply.as_bytes());
}

#[test]
fn every_inbound_line_yields_exactly_one_response() {
    let f = fixture_with_config(AutoReplies::default(), small_fragment_config());
    for payload in [b"status".as_slice(), b"nonsense".as_slice(), b"relay_status".as_slice()] {
        let reply = ble_round_trip(&f, payload);
        assert!(!reply.is_empty());
    }
    assert!(f.ble.lock().unwrap().frames_sent() > 0);
}

#[test]
fn fragment_counters_accumulate() {
    let f = fixture_with_config(AutoReplies::default(), small_fragment_config());
    let reply = ble_round_trip(&f, b"help");
    let guard = f.ble.lock().unwrap();
    assert_eq!(guard.bytes_sent() as usize, reply.len());
    assert_eq!(
        guard.frames_sent() as usize,
        fragments(reply.as_bytes(), 16).count()
    );
}

#[test]
fn peer_disconnect_triggers_readvertising() {
    let f = fixture_with_config(AutoReplies::default(), small_fragment_config());
    {
        let mut guard = f.ble.lock().unwrap();
        guard.start().unwrap();
        guard.set_device_name("renamed-unit").unwrap();
    }
    // The pump delivers the disconnect edge to the service.
    let mut guard = f.ble.lock().unwrap();
    guard.on_peer_disconnected();
    assert_eq!(
        guard.port().advertised_names.last().unwrap(),
        "renamed-unit"
    );
}

#[test]
fn disconnect_flushes_pending_inbound() {
    let f = fixture_with_config(AutoReplies::default(), small_fragment_config());
    let mut guard = f.ble.lock().unwrap();
    guard.on_payload(b"scan");
    guard.on_peer_disconnected();
    assert!(guard.take_inbound().is_none());
}
