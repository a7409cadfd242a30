// Pattern entries: the byte side and the text side of one table row.
//
// Both sides are kept structurally (`ByteMatcher`, `TextSegment`) so the
// scanning engines never compare hex strings. A parsed `TableEntry` holds
// the row as written; `decode_form()` / `encode_form()` derive the
// direction-specific `PatternEntry` the engines consume.

use std::fmt;

/// Wildcard token in both halves of a table row.
pub const WILDCARD: &str = "%%";

// ---------------------------------------------------------------------------
// Byte side
// ---------------------------------------------------------------------------

/// One byte position of a byte pattern.
///
/// Variant order is significant: `Wildcard` sorts before every `Fixed`
/// byte, the same way `%%` sorts before hex digits in the table source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ByteMatcher {
    /// `%%`: binds whatever byte sits at this position.
    Wildcard,
    /// Two hex digits: must equal this byte.
    Fixed(u8),
}

impl ByteMatcher {
    #[inline]
    pub fn is_wildcard(self) -> bool {
        matches!(self, Self::Wildcard)
    }
}

impl fmt::Display for ByteMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wildcard => f.write_str(WILDCARD),
            Self::Fixed(b) => write!(f, "{b:02X}"),
        }
    }
}

/// Render a byte pattern the way it is written in a table (`FE%%`).
pub fn byte_pattern_hex(bytes: &[ByteMatcher]) -> String {
    bytes.iter().map(ToString::to_string).collect()
}

// ---------------------------------------------------------------------------
// Text side
// ---------------------------------------------------------------------------

/// One piece of a text pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TextSegment {
    Literal(String),
    /// Two hex digits of a bound wildcard byte.
    Placeholder,
}

/// Text side of a pattern entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextPattern {
    segments: Vec<TextSegment>,
    /// Length in characters, each placeholder counting as two.
    char_len: usize,
    placeholders: usize,
}

impl TextPattern {
    /// Split `text` into segments.
    ///
    /// When `parametric` is false the whole text is one literal, `%`
    /// included. Otherwise `%%` tokens are taken left to right as
    /// placeholders and a lone `%` stays literal.
    pub fn parse(text: &str, parametric: bool) -> Self {
        let mut segments = Vec::new();
        let mut placeholders = 0;

        if parametric {
            let mut rest = text;
            while let Some(idx) = rest.find(WILDCARD) {
                if idx > 0 {
                    segments.push(TextSegment::Literal(rest[..idx].to_string()));
                }
                segments.push(TextSegment::Placeholder);
                placeholders += 1;
                rest = &rest[idx + WILDCARD.len()..];
            }
            if !rest.is_empty() {
                segments.push(TextSegment::Literal(rest.to_string()));
            }
        } else if !text.is_empty() {
            segments.push(TextSegment::Literal(text.to_string()));
        }

        Self {
            segments,
            char_len: text.chars().count(),
            placeholders,
        }
    }

    pub fn segments(&self) -> &[TextSegment] {
        &self.segments
    }

    /// Number of `%%` placeholders.
    pub fn placeholders(&self) -> usize {
        self.placeholders
    }

    /// Length in characters (the encode-order sort key).
    pub fn char_len(&self) -> usize {
        self.char_len
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn is_parametric(&self) -> bool {
        self.placeholders > 0
    }

    /// The whole text when it has no placeholders.
    pub fn as_literal(&self) -> Option<&str> {
        match self.segments.as_slice() {
            [] => Some(""),
            [TextSegment::Literal(s)] => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for TextPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for seg in &self.segments {
            match seg {
                TextSegment::Literal(s) => f.write_str(s)?,
                TextSegment::Placeholder => f.write_str(WILDCARD)?,
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// A validated table row, exactly as written (escapes already decoded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    line: usize,
    bytes: Vec<ByteMatcher>,
    text: String,
}

impl TableEntry {
    pub(crate) fn new(line: usize, bytes: Vec<ByteMatcher>, text: String) -> Self {
        Self { line, bytes, text }
    }

    /// 1-based line number in the table source.
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn bytes(&self) -> &[ByteMatcher] {
        &self.bytes
    }

    /// Text with `\` already turned into newlines.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_parametric(&self) -> bool {
        self.bytes.iter().any(|m| m.is_wildcard())
    }

    /// Whether this row maps bytes to a single newline and nothing else.
    pub fn is_line_break(&self) -> bool {
        self.text == "\n" && !self.is_parametric()
    }

    /// Form used while decoding: the text is kept verbatim so embedded
    /// newlines are reproduced.
    pub fn decode_form(&self) -> PatternEntry {
        PatternEntry {
            line: self.line,
            bytes: self.bytes.clone(),
            text: TextPattern::parse(&self.text, self.is_parametric()),
            leading_breaks: 0,
            trailing_breaks: 0,
        }
    }

    /// Form used while encoding: leading and trailing newlines are line
    /// boundaries in the input, so they are trimmed from the text and kept
    /// as counts.
    pub fn encode_form(&self) -> PatternEntry {
        let after_leading = self.text.trim_start_matches('\n');
        let trimmed = after_leading.trim_end_matches('\n');
        PatternEntry {
            line: self.line,
            bytes: self.bytes.clone(),
            text: TextPattern::parse(trimmed, self.is_parametric()),
            leading_breaks: self.text.len() - after_leading.len(),
            trailing_breaks: after_leading.len() - trimmed.len(),
        }
    }

    /// Whether a newline sits between other characters of the text. Such a
    /// row can be decoded but never matches a single line while encoding.
    pub fn has_inner_newline(&self) -> bool {
        self.text.trim_matches('\n').contains('\n')
    }
}

impl fmt::Display for TableEntry {
    /// Canonical table line: upper-case hex, newlines written back as `\`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in &self.bytes {
            write!(f, "{m}")?;
        }
        f.write_str("=")?;
        f.write_str(&self.text.replace('\n', "\\"))
    }
}

/// A table row prepared for one scanning direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternEntry {
    line: usize,
    bytes: Vec<ByteMatcher>,
    text: TextPattern,
    leading_breaks: usize,
    trailing_breaks: usize,
}

impl PatternEntry {
    /// 1-based line number of the originating table row.
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn bytes(&self) -> &[ByteMatcher] {
        &self.bytes
    }

    /// Number of input bytes this entry consumes when decoding.
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn text(&self) -> &TextPattern {
        &self.text
    }

    pub fn is_parametric(&self) -> bool {
        self.bytes.iter().any(|m| m.is_wildcard())
    }

    /// Encode form only: newlines trimmed from the start of the text. When
    /// this entry opens a line they stand for the terminators before it.
    pub fn leading_breaks(&self) -> usize {
        self.leading_breaks
    }

    /// Encode form only: newlines trimmed from the end of the text. When
    /// this entry closes a line they stand for the terminators after it.
    pub fn trailing_breaks(&self) -> usize {
        self.trailing_breaks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(bytes: &[ByteMatcher], text: &str) -> TableEntry {
        TableEntry::new(1, bytes.to_vec(), text.to_string())
    }

    #[test]
    fn wildcard_sorts_before_fixed() {
        assert!(ByteMatcher::Wildcard < ByteMatcher::Fixed(0x00));
        assert!(ByteMatcher::Fixed(0x0F) < ByteMatcher::Fixed(0xA0));
    }

    #[test]
    fn placeholders_split_left_to_right() {
        let t = TextPattern::parse("[S$%%%%]", true);
        assert_eq!(
            t.segments(),
            &[
                TextSegment::Literal("[S$".into()),
                TextSegment::Placeholder,
                TextSegment::Placeholder,
                TextSegment::Literal("]".into()),
            ]
        );
        assert_eq!(t.placeholders(), 2);
        assert_eq!(t.char_len(), 8);
        assert_eq!(t.to_string(), "[S$%%%%]");
    }

    #[test]
    fn lone_percent_is_literal() {
        let t = TextPattern::parse("%%%", true);
        assert_eq!(t.placeholders(), 1);
        assert_eq!(
            t.segments(),
            &[TextSegment::Placeholder, TextSegment::Literal("%".into())]
        );
    }

    #[test]
    fn exact_text_keeps_percent() {
        let t = TextPattern::parse("100%%", false);
        assert_eq!(t.as_literal(), Some("100%%"));
        assert!(!t.is_parametric());
    }

    #[test]
    fn encode_form_trims_newlines() {
        let e = entry(&[ByteMatcher::Fixed(0xFF)], "[END]\n");
        assert_eq!(e.decode_form().text().as_literal(), Some("[END]\n"));

        let enc = e.encode_form();
        assert_eq!(enc.text().as_literal(), Some("[END]"));
        assert_eq!((enc.leading_breaks(), enc.trailing_breaks()), (0, 1));
    }

    #[test]
    fn encode_form_counts_newlines_at_both_ends() {
        let e = entry(&[ByteMatcher::Fixed(0xF0)], "\n[S]\n\n");
        let enc = e.encode_form();
        assert_eq!(enc.text().as_literal(), Some("[S]"));
        assert_eq!((enc.leading_breaks(), enc.trailing_breaks()), (1, 2));
        assert!(!e.has_inner_newline());

        assert!(entry(&[ByteMatcher::Fixed(0xF1)], "a\nb").has_inner_newline());
    }

    #[test]
    fn newline_only_entry_has_empty_encode_text() {
        let e = entry(&[ByteMatcher::Fixed(0x00)], "\n");
        assert!(e.is_line_break());
        assert!(e.encode_form().text().is_empty());
    }

    #[test]
    fn canonical_display() {
        let e = entry(
            &[ByteMatcher::Fixed(0xFE), ByteMatcher::Wildcard],
            "[X$%%]\n",
        );
        assert_eq!(e.to_string(), "FE%%=[X$%%]\\");
        assert_eq!(byte_pattern_hex(e.bytes()), "FE%%");
    }
}
