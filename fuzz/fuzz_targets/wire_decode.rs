//! Fuzz target for wire frame decoding
//!
//! This fuzzer tests event decoding with arbitrary byte sequences to find:
//! - Parser crashes or panics
//! - Pathological allocation from hostile JSON
//! - Frames that decode into impossible event shapes
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use matchwire_proto::{ClientEvent, ServerEvent};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Both directions must reject garbage without panicking
    let _ = ServerEvent::from_wire(text);
    let _ = ClientEvent::from_wire(text);

    // Anything that decodes must re-encode
    if let Ok(event) = ServerEvent::from_wire(text) {
        let reencoded = event.to_wire().expect("decoded event must re-encode");
        let again = ServerEvent::from_wire(&reencoded).expect("re-encoded frame must decode");
        assert_eq!(event, again);
    }
});
