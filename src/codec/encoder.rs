// Encode engine: text lines -> binary.
//
// Input text is split into lines, and each non-empty line is grouped with
// the empty lines after it into a run. Each run is looked up in the line
// cache by fingerprint; on a hit the cached bytes are emitted as-is. On a
// miss a cursor walks the line, the encode-ordered table is scanned front
// to back and the first entry whose text matches at the cursor wins. Its
// byte pattern is emitted with every wildcard filled from the two hex
// digits read at the corresponding placeholder.
//
// Line terminators: entries keep the newlines trimmed from either end of
// their text as counts. The last entry of a line claims that many of the
// run's terminators from the front, the first entry of the next line
// claims that many from the back. Each terminator nobody claims is written
// as the table's line-break bytes.

use log::debug;
use thiserror::Error;

use crate::cache::{Fingerprint, LineCache};
use crate::table::parser::hex_value;
use crate::table::{ByteMatcher, Direction, PatternEntry, PatternTable, TextSegment};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// No entry matches at `column` (0-based, in characters) of `line`
    /// (1-based). `content` is the whole line.
    #[error("input line {line}, column {column}: \"{content}\" not defined in table")]
    UnresolvedTextSpan {
        line: usize,
        content: String,
        column: usize,
    },
}

impl EncodeError {
    /// The offending line with a caret under the failing column.
    pub fn caret_diagnostic(&self) -> String {
        match self {
            Self::UnresolvedTextSpan {
                content, column, ..
            } => format!("{content}\n{:>width$}", "^", width = column + 1),
        }
    }
}

// ---------------------------------------------------------------------------
// Lines
// ---------------------------------------------------------------------------

/// One line of encoder input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    /// 1-based line number.
    pub number: usize,
    /// Content without its terminator.
    pub content: &'a str,
    /// Whether a `\n` or `\r\n` followed the content.
    pub terminated: bool,
}

/// Split `text` into lines on `\n`, treating a preceding `\r` as part of
/// the terminator. A trailing terminator does not start an extra line.
pub fn split_lines(text: &str) -> impl Iterator<Item = Line<'_>> {
    text.split_inclusive('\n').enumerate().map(|(idx, raw)| {
        let (content, terminated) = match raw.strip_suffix('\n') {
            Some(body) => (body.strip_suffix('\r').unwrap_or(body), true),
            None => (raw, false),
        };
        Line {
            number: idx + 1,
            content,
            terminated,
        }
    })
}

/// A line together with the empty lines that follow it: the unit the
/// encoder caches.
///
/// Every run but the first starts at a non-empty line. Its bytes depend
/// only on its own text and `absorbed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRun<'a> {
    /// 1-based number of the first line.
    pub number: usize,
    /// Input lines covered.
    pub lines: usize,
    /// Content of the first line. The others are empty.
    pub content: &'a str,
    /// Terminators in the run.
    pub breaks: usize,
    /// Terminators at the end of the run claimed by the first entry of the
    /// next run.
    pub absorbed: usize,
}

impl LineRun<'_> {
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of_run(self.content, self.breaks, self.absorbed)
    }
}

impl<'a> From<&Line<'a>> for LineRun<'a> {
    fn from(line: &Line<'a>) -> Self {
        Self {
            number: line.number,
            lines: 1,
            content: line.content,
            breaks: usize::from(line.terminated),
            absorbed: 0,
        }
    }
}

/// Group the lines of `text` into runs and record how many terminators
/// each run gives up to the leading newlines of the next run's first entry.
pub fn line_runs<'a>(table: &PatternTable, text: &'a str) -> Vec<LineRun<'a>> {
    let mut runs: Vec<LineRun<'a>> = Vec::new();
    for line in split_lines(text) {
        if line.content.is_empty()
            && let Some(run) = runs.last_mut()
        {
            run.lines += 1;
            run.breaks += usize::from(line.terminated);
            continue;
        }
        runs.push(LineRun::from(&line));
    }

    let mut bound = Vec::new();
    for i in 1..runs.len() {
        let leading = first_match(table, runs[i].content, &mut bound)
            .map_or(0, |(entry, _)| entry.leading_breaks());
        runs[i - 1].absorbed = leading.min(runs[i - 1].breaks);
    }
    runs
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Result of encoding a whole text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodeOutput {
    pub bytes: Vec<u8>,
    /// Lines seen.
    pub lines: usize,
    /// Lines matched against the table and added to the cache.
    pub fresh_lines: usize,
    /// Lines served from the cache.
    pub cached_lines: usize,
}

/// Encode every line of `text`, consulting and extending `cache`.
///
/// The caller is responsible for binding `cache` to the table first.
pub fn encode_text(
    table: &PatternTable,
    text: &str,
    cache: &mut LineCache,
) -> Result<EncodeOutput, EncodeError> {
    let mut output = EncodeOutput::default();
    let mut run_bytes = Vec::new();

    for run in line_runs(table, text) {
        output.lines += run.lines;
        let fingerprint = run.fingerprint();

        if let Some(cached) = cache.lookup(&fingerprint) {
            output.bytes.extend_from_slice(cached);
            output.cached_lines += run.lines;
            continue;
        }

        run_bytes.clear();
        encode_run(table, &run, &mut run_bytes)?;
        output.bytes.extend_from_slice(&run_bytes);

        if !run_bytes.is_empty() {
            cache.insert(fingerprint, run_bytes.clone());
            output.fresh_lines += run.lines;
        }
    }

    debug!(
        "encoded {} lines: {} fresh, {} cached, {} bytes",
        output.lines,
        output.fresh_lines,
        output.cached_lines,
        output.bytes.len()
    );
    Ok(output)
}

/// Encode one line on its own, appending its bytes to `out`. A terminator
/// is only claimed by the line's own last entry.
pub fn encode_line(
    table: &PatternTable,
    line: &Line<'_>,
    out: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    encode_run(table, &LineRun::from(line), out)
}

/// Encode one run, appending its bytes to `out`.
pub fn encode_run(
    table: &PatternTable,
    run: &LineRun<'_>,
    out: &mut Vec<u8>,
) -> Result<(), EncodeError> {
    debug_assert_eq!(table.direction(), Direction::Encode);

    let content = run.content;
    let mut pos = 0usize;
    let mut claimed = 0usize;
    let mut bound = Vec::new();

    while pos < content.len() {
        let Some((entry, width)) = first_match(table, &content[pos..], &mut bound) else {
            return Err(EncodeError::UnresolvedTextSpan {
                line: run.number,
                content: content.to_string(),
                column: content[..pos].chars().count(),
            });
        };

        emit(entry, &bound, out);
        pos += width;
        claimed = entry.trailing_breaks();
    }

    let unclaimed = run
        .breaks
        .saturating_sub(run.absorbed)
        .saturating_sub(claimed);
    if unclaimed > 0
        && let Some(line_break) = table.line_break()
    {
        for _ in 0..unclaimed {
            out.extend_from_slice(line_break);
        }
    }

    Ok(())
}

/// First entry in scan order whose text matches at the start of `rest`,
/// with its width. `bound` holds that entry's placeholder bytes.
fn first_match<'t>(
    table: &'t PatternTable,
    rest: &str,
    bound: &mut Vec<u8>,
) -> Option<(&'t PatternEntry, usize)> {
    table.entries().iter().find_map(|entry| {
        bound.clear();
        match_text(entry, rest, bound).map(|width| (entry, width))
    })
}

/// Match `entry`'s text at the start of `rest`.
///
/// Literal segments must match verbatim; each placeholder binds two hex
/// digits, pushed to `bound` as a byte. Returns the matched width in bytes
/// of `rest`.
pub fn match_text(entry: &PatternEntry, rest: &str, bound: &mut Vec<u8>) -> Option<usize> {
    let text = entry.text();
    if let Some(literal) = text.as_literal() {
        return rest.starts_with(literal).then_some(literal.len());
    }

    let mut width = 0usize;
    for seg in text.segments() {
        let tail = &rest.as_bytes()[width..];
        match seg {
            TextSegment::Literal(s) => {
                if !tail.starts_with(s.as_bytes()) {
                    return None;
                }
                width += s.len();
            }
            TextSegment::Placeholder => {
                let [hi, lo, ..] = *tail else {
                    return None;
                };
                bound.push((hex_value(hi)? << 4) | hex_value(lo)?);
                width += 2;
            }
        }
    }
    Some(width)
}

/// Append `entry`'s byte pattern with wildcards taken from `bound` in order.
fn emit(entry: &PatternEntry, bound: &[u8], out: &mut Vec<u8>) {
    let mut bound = bound.iter().copied();
    for m in entry.bytes() {
        match *m {
            ByteMatcher::Fixed(b) => out.push(b),
            ByteMatcher::Wildcard => {
                if let Some(b) = bound.next() {
                    out.push(b);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
