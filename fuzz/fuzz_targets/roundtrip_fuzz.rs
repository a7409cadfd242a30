#![no_main]
use libfuzzer_sys::fuzz_target;
use tblcodec::cache::LineCache;
use tblcodec::engine::Codec;

// Covers every byte, so any input decodes and must re-encode unchanged.
// F0 and F1 carry newlines at the start and end of their text.
fn table() -> String {
    let mut table = String::from("0A=\\\nFE%%=[X$%%]\nFE=<FE>\nF0=\\[S]\nF1=[E]\\\\\n");
    for b in 0..=255u8 {
        if !matches!(b, 0x0A | 0xFE | 0xF0 | 0xF1) {
            table.push_str(&format!("{b:02X}=<{b:02X}>\n"));
        }
    }
    table
}

fuzz_target!(|data: &[u8]| {
    let codec = Codec::from_table(&table()).unwrap();
    let text = codec.decode(data).unwrap();

    let mut cache = LineCache::new();
    let cold = codec.encode_text(&text, &mut cache).unwrap();
    assert_eq!(cold.bytes, data);

    let warm = codec.encode_text(&text, &mut cache).unwrap();
    assert_eq!(warm.bytes, data);
    assert_eq!(warm.fresh_lines, 0);
});
