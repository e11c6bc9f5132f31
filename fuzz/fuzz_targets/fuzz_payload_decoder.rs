//! Fuzz target: RX timestamp and TX frame decoders
//!
//! Drives arbitrary bytes into both decoders and asserts that they never
//! panic and that every accepted frame re-encodes to something that
//! decodes again.
//!
//! cargo fuzz run fuzz_payload_decoder

#![no_main]

use blesense::codec::{TIMESTAMP_LEN, decode_frame, decode_timestamp};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    match decode_timestamp(data) {
        Ok(ts) => assert_eq!(ts.to_le_bytes(), data[..TIMESTAMP_LEN]),
        Err(_) => assert!(data.len() < TIMESTAMP_LEN),
    }

    if let Ok(frame) = decode_frame(data) {
        if frame.reading.is_finite() {
            let wire = frame.encode(3);
            assert!(decode_frame(wire.as_bytes()).is_ok(), "re-encoded frame must decode");
        }
    }
});
