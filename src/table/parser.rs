// Translation table parser.
//
// Grammar, one row per line:
//   <hex>=<text>
// where <hex> is two or more of [0-9A-Fa-f%] in pairs (two hex digits or
// `%%`) and <text> is at least one character. `\` in the text stands for a
// newline. Blank lines and lines starting with `;` or `//` are skipped;
// anything else is a fatal error that names the offending line.

use log::warn;
use thiserror::Error;

use super::entry::{ByteMatcher, TableEntry, TextPattern, byte_pattern_hex};

/// Escape character that stands for a newline in table text.
pub const LINE_ESCAPE: char = '\\';

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a table line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedReason {
    #[error("not a <hex>=<text> entry")]
    Unrecognized,
    #[error("odd number of hex digits")]
    OddHexLength,
    #[error("byte pair {0:?} mixes a wildcard with a hex digit")]
    MixedWildcardPair(String),
    #[error("{bytes} byte wildcard(s) but {text} text placeholder(s)")]
    WildcardCountMismatch { bytes: usize, text: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// `line` is 1-based; `content` is the raw line.
    #[error("table line {line}: {reason}: \"{content}\"")]
    MalformedTableLine {
        line: usize,
        content: String,
        reason: MalformedReason,
    },
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a whole table source into validated entries, in source order.
pub fn parse_table(source: &str) -> Result<Vec<TableEntry>, TableError> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let mut entries = Vec::new();

    for (idx, raw) in source.lines().enumerate() {
        let line = idx + 1;
        let parsed = parse_line(raw).map_err(|reason| TableError::MalformedTableLine {
            line,
            content: raw.to_string(),
            reason,
        })?;

        if let Some((bytes, text)) = parsed {
            if bytes.iter().all(|m| m.is_wildcard()) {
                warn!(
                    "table line {line}: {} has no fixed byte and never matches while decoding",
                    byte_pattern_hex(&bytes)
                );
            }
            let entry = TableEntry::new(line, bytes, text);
            if entry.has_inner_newline() {
                warn!("table line {line}: text has an inner newline and never matches while encoding");
            }
            entries.push(entry);
        }
    }

    Ok(entries)
}

/// Parse one line. `Ok(None)` for blank and comment lines.
pub fn parse_line(line: &str) -> Result<Option<(Vec<ByteMatcher>, String)>, MalformedReason> {
    if is_skipped(line) {
        return Ok(None);
    }

    let (hex, text) = line.split_once('=').ok_or(MalformedReason::Unrecognized)?;
    if hex.len() < 2
        || text.is_empty()
        || !hex.bytes().all(|b| b.is_ascii_hexdigit() || b == b'%')
    {
        return Err(MalformedReason::Unrecognized);
    }
    if !hex.len().is_multiple_of(2) {
        return Err(MalformedReason::OddHexLength);
    }

    let bytes = hex
        .as_bytes()
        .chunks_exact(2)
        .map(parse_pair)
        .collect::<Result<Vec<_>, _>>()?;

    let text = text.replace(LINE_ESCAPE, "\n");

    let wildcards = bytes.iter().filter(|m| m.is_wildcard()).count();
    if wildcards > 0 {
        let placeholders = TextPattern::parse(&text, true).placeholders();
        if placeholders != wildcards {
            return Err(MalformedReason::WildcardCountMismatch {
                bytes: wildcards,
                text: placeholders,
            });
        }
    }

    Ok(Some((bytes, text)))
}

fn is_skipped(line: &str) -> bool {
    line.trim().is_empty() || line.starts_with(';') || line.starts_with("//")
}

fn parse_pair(pair: &[u8]) -> Result<ByteMatcher, MalformedReason> {
    match pair {
        [b'%', b'%'] => Ok(ByteMatcher::Wildcard),
        [hi, lo] => match (hex_value(*hi), hex_value(*lo)) {
            (Some(hi), Some(lo)) => Ok(ByteMatcher::Fixed((hi << 4) | lo)),
            _ => Err(MalformedReason::MixedWildcardPair(
                String::from_utf8_lossy(pair).into_owned(),
            )),
        },
        _ => Err(MalformedReason::Unrecognized),
    }
}

/// Value of one ASCII hex digit.
#[inline]
pub(crate) fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ByteMatcher::{Fixed, Wildcard};

    fn malformed(source: &str) -> (usize, String, MalformedReason) {
        match parse_table(source) {
            Err(TableError::MalformedTableLine {
                line,
                content,
                reason,
            }) => (line, content, reason),
            Ok(entries) => panic!("expected an error, parsed {entries:?}"),
        }
    }

    #[test]
    fn parses_simple_entries() {
        let entries = parse_table("2C=A\n015D=[Item]\n").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].bytes(), &[Fixed(0x2C)]);
        assert_eq!(entries[0].text(), "A");
        assert_eq!(entries[1].bytes(), &[Fixed(0x01), Fixed(0x5D)]);
        assert_eq!(entries[1].text(), "[Item]");
        assert_eq!(entries[1].line(), 2);
    }

    #[test]
    fn hex_is_case_insensitive() {
        let entries = parse_table("fe=x\nFE=y").unwrap();
        assert_eq!(entries[0].bytes(), entries[1].bytes());
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let source = "; comment\n// another\n\n   \n41=A\n";
        let entries = parse_table(source).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].line(), 5);
    }

    #[test]
    fn backslash_becomes_newline() {
        let entries = parse_table("00=\\\nFF=[END]\\\\").unwrap();
        assert_eq!(entries[0].text(), "\n");
        assert_eq!(entries[1].text(), "[END]\n\n");
    }

    #[test]
    fn text_may_contain_equals() {
        let entries = parse_table("3D===").unwrap();
        assert_eq!(entries[0].text(), "==");
    }

    #[test]
    fn wildcards_parse() {
        let entries = parse_table("05%%=[C$%%]\nFE%%%%=[S$%%%%]").unwrap();
        assert_eq!(entries[0].bytes(), &[Fixed(0x05), Wildcard]);
        assert_eq!(entries[1].bytes(), &[Fixed(0xFE), Wildcard, Wildcard]);
        assert!(entries[1].is_parametric());
    }

    #[test]
    fn odd_hex_length_is_rejected() {
        let (line, content, reason) = malformed("41=A\nABC=foo");
        assert_eq!(line, 2);
        assert_eq!(content, "ABC=foo");
        assert_eq!(reason, MalformedReason::OddHexLength);
    }

    #[test]
    fn unrecognized_lines_are_rejected() {
        for bad in ["hello", "4=A", "41=", "4G=A", " 41=A", "=A"] {
            let (line, content, reason) = malformed(bad);
            assert_eq!(line, 1, "{bad}");
            assert_eq!(content, bad);
            assert_eq!(reason, MalformedReason::Unrecognized, "{bad}");
        }
    }

    #[test]
    fn mixed_wildcard_pair_is_rejected() {
        let (_, _, reason) = malformed("0%%1=[%%]");
        assert_eq!(reason, MalformedReason::MixedWildcardPair("0%".into()));
    }

    #[test]
    fn wildcard_count_must_match() {
        let (_, _, reason) = malformed("05%%=[C$]");
        assert_eq!(
            reason,
            MalformedReason::WildcardCountMismatch { bytes: 1, text: 0 }
        );

        let (_, _, reason) = malformed("05%%=[%%%%]");
        assert_eq!(
            reason,
            MalformedReason::WildcardCountMismatch { bytes: 1, text: 2 }
        );
    }

    #[test]
    fn exact_entry_text_may_hold_percent() {
        let entries = parse_table("25=%%").unwrap();
        assert!(!entries[0].is_parametric());
    }

    #[test]
    fn crlf_and_bom_are_tolerated() {
        let entries = parse_table("\u{feff}41=A\r\n42=B\r\n").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].text(), "A");
        assert_eq!(entries[1].text(), "B");
    }

    #[test]
    fn error_message_names_line() {
        let err = parse_table("ABC=foo").unwrap_err();
        assert_eq!(
            err.to_string(),
            "table line 1: odd number of hex digits: \"ABC=foo\""
        );
    }
}
