//! Property tests for the message codec.

use proptest::prelude::*;
use sseflow::Message;

proptest! {
    // Printable-ASCII payloads (no embedded line breaks) survive an
    // encode/decode round trip unchanged; an all-unset message encodes to
    // nothing at all.
    #[test]
    fn encode_decode_round_trip(
        comments in prop::collection::vec("[ -~]*", 0..3),
        id in prop::option::of("[ -~]*"),
        retry in 0u64..100_000,
        event in "[ -~]*",
        data in "[ -~]*",
    ) {
        let original = Message {
            comments,
            id,
            retry,
            event,
            data,
        };

        let wire = original.to_string();
        if original.is_empty() {
            prop_assert_eq!(wire, "");
            return Ok(());
        }
        prop_assert!(wire.ends_with("\n\n"));

        let mut decoded = Message::new();
        for line in wire.lines() {
            if line.is_empty() {
                break;
            }
            prop_assert!(decoded.decode_line(line).is_ok());
        }
        prop_assert_eq!(decoded, original);
    }
}
