// Pattern ordering.
//
// Both engines scan their table front to back and stop at the first entry
// that matches, so the table order alone decides between overlapping
// entries. Order, most preferred first:
//
//   decode: longer byte pattern, then higher hex string (`%%` lowest)
//   encode: longer text, then exact before parametric, then higher text
//
// The sort is stable: entries with identical keys keep table-source order.

use std::cmp::{Ordering, Reverse};

use log::debug;

use super::entry::{ByteMatcher, PatternEntry, TableEntry};

/// Scanning direction a table is ordered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Bytes to text.
    Decode,
    /// Text to bytes.
    Encode,
}

/// An ordered, immutable pattern list for one direction.
#[derive(Debug, Clone)]
pub struct PatternTable {
    direction: Direction,
    entries: Vec<PatternEntry>,
    line_break: Option<Vec<u8>>,
}

impl PatternTable {
    /// Derive the direction-specific entries and order them.
    ///
    /// For `Encode`, entries whose text is only newlines cannot be matched
    /// character by character and are left out of the scan list; the first
    /// single-newline entry becomes the table's line-break bytes.
    pub fn build(direction: Direction, entries: &[TableEntry]) -> Self {
        let (mut patterns, line_break): (Vec<PatternEntry>, Option<Vec<u8>>) = match direction {
            Direction::Decode => (entries.iter().map(TableEntry::decode_form).collect(), None),
            Direction::Encode => {
                let line_break = entries
                    .iter()
                    .find(|e| e.is_line_break())
                    .map(|e| e.bytes().iter().filter_map(fixed_byte).collect());
                let patterns = entries
                    .iter()
                    .map(TableEntry::encode_form)
                    .filter(|p| !p.text().is_empty())
                    .collect();
                (patterns, line_break)
            }
        };

        match direction {
            Direction::Decode => patterns.sort_by(decode_order),
            Direction::Encode => patterns.sort_by_cached_key(|p| {
                (
                    Reverse(p.text().char_len()),
                    p.is_parametric(),
                    Reverse(p.text().to_string()),
                )
            }),
        }

        debug!(
            "{direction:?} table: {} scan entries, line break {}",
            patterns.len(),
            if line_break.is_some() { "mapped" } else { "unmapped" }
        );

        Self {
            direction,
            entries: patterns,
            line_break,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Entries in scan order.
    pub fn entries(&self) -> &[PatternEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes emitted for an unabsorbed line terminator (encode only).
    pub fn line_break(&self) -> Option<&[u8]> {
        self.line_break.as_deref()
    }
}

/// Decode comparator: longer byte patterns first, then reverse hex order.
///
/// Comparing `ByteMatcher` sequences equals comparing their upper-case hex
/// spelling, because `Wildcard` sorts below every fixed byte just as `%`
/// sorts below every hex digit.
pub fn decode_order(a: &PatternEntry, b: &PatternEntry) -> Ordering {
    b.byte_len()
        .cmp(&a.byte_len())
        .then_with(|| b.bytes().cmp(a.bytes()))
}

fn fixed_byte(m: &ByteMatcher) -> Option<u8> {
    match *m {
        ByteMatcher::Fixed(b) => Some(b),
        ByteMatcher::Wildcard => None,
    }
}
