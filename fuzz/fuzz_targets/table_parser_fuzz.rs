#![no_main]
use libfuzzer_sys::fuzz_target;
use tblcodec::table::{Direction, PatternTable, parse_table};

fuzz_target!(|data: &[u8]| {
    let source = String::from_utf8_lossy(data);
    if let Ok(entries) = parse_table(&source) {
        // Every accepted entry prints back to a line that parses to itself.
        for entry in &entries {
            let line = entry.to_string();
            let reparsed = parse_table(&line).unwrap();
            assert_eq!(reparsed.len(), 1);
            assert_eq!(reparsed[0].bytes(), entry.bytes());
        }
        let _ = PatternTable::build(Direction::Decode, &entries);
        let _ = PatternTable::build(Direction::Encode, &entries);
    }
});
