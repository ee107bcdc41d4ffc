//! Fuzz target for InboundEvent::decode
//!
//! This fuzzer tests server frame decoding (JSON envelope + payload) with:
//! - Malformed JSON and invalid UTF-8
//! - Unknown event names
//! - Payloads that don't match their event name
//! - Blank identities and mistyped message ids
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error,
//! and every accepted frame must survive re-encoding unchanged.

#![no_main]

use libfuzzer_sys::fuzz_target;
use parley_proto::InboundEvent;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let Ok(event) = InboundEvent::decode(text) else {
        return;
    };

    let encoded = event.encode().expect("decoded event must encode");
    let decoded = InboundEvent::decode(&encoded).expect("encoded event must decode");
    assert_eq!(event, decoded);
});
