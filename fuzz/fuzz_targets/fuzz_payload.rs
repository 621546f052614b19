//! Fuzz target: `sync::decode_payload`
//!
//! Drives arbitrary byte sequences into the inbound payload classifier
//! and asserts that it never panics and that every accepted payload is
//! already normalized (remote data is untrusted).
//!
//! cargo fuzz run fuzz_payload

#![no_main]

use libfuzzer_sys::fuzz_target;
use relayhub::sync::{decode_payload, InboundPayload};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };

    match decode_payload(text) {
        Err(_) => {}
        Ok(InboundPayload::Delta { record, .. }) => {
            assert_eq!(
                record.clone().normalized(),
                record,
                "delta must be normalized"
            );
        }
        Ok(InboundPayload::Snapshot(map)) => {
            for (key, rec) in &map {
                // Entries lacking an explicit id get it from the map key.
                assert!(!rec.id.is_empty() || key.is_empty());
                assert_eq!(rec.clone().normalized(), *rec, "snapshot entries must be normalized");
            }
        }
    }
});
