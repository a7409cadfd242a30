// Decode engine: binary buffer -> text.
//
// A cursor walks the input. At each position the decode-ordered table is
// scanned front to back and the first matching entry wins; its text is
// emitted with every placeholder replaced by the hex of the byte bound at
// the corresponding wildcard, and the cursor advances by the entry's byte
// length. A position no entry matches is fatal: skipping it would shift
// every following byte.

use thiserror::Error;

use crate::table::{ByteMatcher, Direction, PatternEntry, PatternTable, TextSegment};

/// Bytes of input shown in an unresolved-byte error.
const CONTEXT_LEN: usize = 8;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// No entry matches at `offset`. `context` holds the leading bytes.
    #[error("input offset {offset:#X}: {} not defined in table", hex_context(.context))]
    UnresolvedByteSequence {
        offset: usize,
        byte: u8,
        context: Vec<u8>,
    },
}

fn hex_context(bytes: &[u8]) -> String {
    let mut s: String = bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ");
    s.push_str("...");
    s
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Summary of one decode pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeSummary {
    /// Input bytes consumed (always the whole input on success).
    pub bytes_consumed: usize,
    /// Number of table entries emitted.
    pub entries_matched: usize,
}

/// Decode `input` completely, returning the text.
pub fn decode(table: &PatternTable, input: &[u8]) -> Result<String, DecodeError> {
    let mut out = String::with_capacity(input.len() * 2);
    decode_into(table, input, &mut out)?;
    Ok(out)
}

/// Decode `input`, appending the text to `out`.
pub fn decode_into(
    table: &PatternTable,
    input: &[u8],
    out: &mut String,
) -> Result<DecodeSummary, DecodeError> {
    debug_assert_eq!(table.direction(), Direction::Decode);

    let mut pos = 0usize;
    let mut entries_matched = 0usize;

    while pos < input.len() {
        let window = &input[pos..];
        let Some(entry) = table
            .entries()
            .iter()
            .find(|e| match_score(e.bytes(), window) > 0)
        else {
            return Err(DecodeError::UnresolvedByteSequence {
                offset: pos,
                byte: window[0],
                context: window[..window.len().min(CONTEXT_LEN)].to_vec(),
            });
        };

        render(entry, &window[..entry.byte_len()], out);
        pos += entry.byte_len();
        entries_matched += 1;
    }

    Ok(DecodeSummary {
        bytes_consumed: pos,
        entries_matched,
    })
}

/// Score a byte pattern against the start of `window`.
///
/// A fixed byte that matches adds 2, a wildcard adds 1, and any fixed byte
/// that differs makes the score 0. A pattern needs at least one fixed byte
/// to match, and it must fit inside `window`. Zero means no match.
pub fn match_score(pattern: &[ByteMatcher], window: &[u8]) -> usize {
    if pattern.len() > window.len() {
        return 0;
    }

    let mut score = 0usize;
    let mut anchored = false;
    for (m, &byte) in pattern.iter().zip(window) {
        match *m {
            ByteMatcher::Fixed(expected) if expected == byte => {
                score += 2;
                anchored = true;
            }
            ByteMatcher::Fixed(_) => return 0,
            ByteMatcher::Wildcard => score += 1,
        }
    }

    if anchored { score } else { 0 }
}

/// Append `entry`'s text, binding placeholders to the wildcard bytes of
/// `matched` in order.
fn render(entry: &PatternEntry, matched: &[u8], out: &mut String) {
    let mut bound = entry
        .bytes()
        .iter()
        .zip(matched)
        .filter(|(m, _)| m.is_wildcard())
        .map(|(_, &b)| b);

    for seg in entry.text().segments() {
        match seg {
            TextSegment::Literal(s) => out.push_str(s),
            TextSegment::Placeholder => {
                if let Some(b) = bound.next() {
                    out.push(HEX_DIGITS[usize::from(b >> 4)] as char);
                    out.push(HEX_DIGITS[usize::from(b & 0x0F)] as char);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
