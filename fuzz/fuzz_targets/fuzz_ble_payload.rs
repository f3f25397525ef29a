//! Fuzz target: `CommandLink` inbound/outbound byte handling.
//!
//! Arbitrary payloads must never panic the inbound line extraction, and
//! the fragmenting sender must reproduce its input exactly.
//!
//! cargo fuzz run fuzz_ble_payload

#![no_main]

use libfuzzer_sys::fuzz_target;
use netrelay::transport::fragments;

fuzz_target!(|input: (Vec<u8>, u16)| {
    let (data, max) = input;
    let max = usize::from(max);

    let parts: Vec<&[u8]> = fragments(&data, max).collect();
    // Even max = 0 is clamped rather than dividing by zero.
    let effective = max.max(1);
    assert!(parts.iter().all(|p| !p.is_empty() && p.len() <= effective));

    let joined: Vec<u8> = parts.concat();
    assert_eq!(joined, data);
});
