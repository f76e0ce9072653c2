//! Fuzz target for transfer frame decoding.
//!
//! Arbitrary bytes must never panic the decoder. Frames that decode must
//! re-encode to bytes that decode to the same frame, and any passport they
//! carry must open or fail cleanly.

#![no_main]

use libfuzzer_sys::fuzz_target;

use interconnect_crypto::IdentityVerifier;
use interconnect_wire::TransferFrame;

fuzz_target!(|data: &[u8]| {
    let Ok(frame) = TransferFrame::decode(data) else {
        return;
    };

    let encoded = frame.encode().expect("decoded frame must re-encode");
    let again = TransferFrame::decode(&encoded).expect("re-encoded frame must decode");
    assert_eq!(frame, again);

    if let TransferFrame::Transfer(message) = &frame {
        let _ = IdentityVerifier::with_defaults().open(&message.envelope);
    }
});
