use std::fmt::Write;

use proptest::prelude::*;
use tblcodec::cache::LineCache;
use tblcodec::codec::DecodeError;
use tblcodec::engine::Codec;
use tblcodec::table::parse_table;

/// A table covering every byte: `<XX>` per byte, `0A` as a line break and
/// `FE` as a one-argument control code.
fn full_table() -> String {
    let mut table = String::from("; every byte\n0A=\\\nFE%%=[X$%%]\nFE=<FE>\n");
    for b in 0..=255u8 {
        if b != 0x0A && b != 0xFE {
            writeln!(table, "{b:02X}=<{b:02X}>").unwrap();
        }
    }
    table
}

/// `full_table` with `F0` and `F1` mapped to text that starts or ends
/// with newlines.
fn newline_table() -> String {
    let mut table = String::from("0A=\\\nFE%%=[X$%%]\nFE=<FE>\nF0=\\[S]\nF1=[E]\\\\\n");
    for b in 0..=255u8 {
        if !matches!(b, 0x0A | 0xFE | 0xF0 | 0xF1) {
            writeln!(table, "{b:02X}=<{b:02X}>").unwrap();
        }
    }
    table
}

/// Single-byte table without `0xFF`.
fn sparse_table() -> String {
    let mut table = String::new();
    for b in 0..0xFFu8 {
        writeln!(table, "{b:02X}=<{b:02X}>").unwrap();
    }
    table
}

proptest! {
    #[test]
    fn prop_decode_encode_roundtrip(bytes in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let codec = Codec::from_table(&full_table()).unwrap();
        let text = codec.decode(&bytes).unwrap();
        let encoded = codec.encode(&text).unwrap();
        prop_assert_eq!(encoded, bytes);
    }

    #[test]
    fn prop_newline_entries_roundtrip(
        bytes in proptest::collection::vec(
            prop_oneof![any::<u8>(), Just(0x0A), Just(0xF0), Just(0xF1)],
            0..512,
        ),
    ) {
        let codec = Codec::from_table(&newline_table()).unwrap();
        let text = codec.decode(&bytes).unwrap();

        let mut cache = LineCache::new();
        prop_assert_eq!(&codec.encode_text(&text, &mut cache).unwrap().bytes, &bytes);
        prop_assert_eq!(&codec.encode_text(&text, &mut cache).unwrap().bytes, &bytes);
    }

    #[test]
    fn prop_encode_is_deterministic(bytes in proptest::collection::vec(any::<u8>(), 0..1024)) {
        let codec = Codec::from_table(&full_table()).unwrap();
        let text = codec.decode(&bytes).unwrap();
        prop_assert_eq!(codec.encode(&text).unwrap(), codec.encode(&text).unwrap());
    }

    #[test]
    fn prop_warm_cache_matches_cold(
        first in proptest::collection::vec(any::<u8>(), 0..1024),
        second in proptest::collection::vec(any::<u8>(), 0..1024),
    ) {
        let codec = Codec::from_table(&full_table()).unwrap();
        let warmup = codec.decode(&first).unwrap();
        let text = codec.decode(&second).unwrap() + &warmup;

        let mut cache = LineCache::new();
        codec.encode_text(&warmup, &mut cache).unwrap();
        let warm = codec.encode_text(&text, &mut cache).unwrap();

        prop_assert_eq!(warm.bytes, codec.encode(&text).unwrap());
    }

    #[test]
    fn prop_unresolved_byte_is_first_ff(bytes in proptest::collection::vec(any::<u8>(), 0..1024)) {
        let codec = Codec::from_table(&sparse_table()).unwrap();
        match bytes.iter().position(|&b| b == 0xFF) {
            Some(pos) => {
                let err = codec.decode(&bytes).unwrap_err();
                let DecodeError::UnresolvedByteSequence { offset, byte, .. } = err;
                prop_assert_eq!(offset, pos);
                prop_assert_eq!(byte, 0xFF);
            }
            None => prop_assert_eq!(codec.decode(&bytes).unwrap().len(), bytes.len() * 4),
        }
    }

    #[test]
    fn prop_table_parser_never_panics(source in "\\PC{0,64}(\n\\PC{0,64}){0,8}") {
        let _ = parse_table(&source);
    }

    #[test]
    fn prop_decoder_never_panics(
        table in "([0-9A-F%]{2}){1,3}=[A-Za-z%]{1,6}",
        bytes in proptest::collection::vec(any::<u8>(), 0..256),
    ) {
        if let Ok(codec) = Codec::from_table(&table) {
            let _ = codec.decode(&bytes);
        }
    }
}
