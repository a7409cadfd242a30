#![no_main]
use libfuzzer_sys::fuzz_target;
use tblcodec::codec::DecodeError;
use tblcodec::engine::Codec;

// Single-byte entries for even bytes, and a one-argument code at 0x01.
fn table() -> String {
    let mut table = String::from("01%%=<%%>\n");
    for b in (0..=255u8).step_by(2) {
        table.push_str(&format!("{b:02X}=[{b:02X}]\n"));
    }
    table
}

fuzz_target!(|data: &[u8]| {
    let codec = Codec::from_table(&table()).unwrap();
    match codec.decode(data) {
        Ok(text) => assert!(text.len() >= data.len() * 2),
        Err(DecodeError::UnresolvedByteSequence { offset, byte, context }) => {
            assert!(offset < data.len());
            assert_eq!(data[offset], byte);
            assert_eq!(context.first(), Some(&byte));
        }
    }
});
