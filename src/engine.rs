// Codec engine: one parsed table, both directions.
//
// Parses the table once, derives the decode- and encode-ordered pattern
// lists, and computes the table digest that line caches are bound to.
// Everything here works on in-memory buffers; file handling lives in `io`.

use log::{debug, warn};

use crate::cache::{Fingerprint, LineCache};
use crate::codec::decoder::{self, DecodeError, DecodeSummary};
use crate::codec::encoder::{self, EncodeError, EncodeOutput, Line};
use crate::table::{Direction, PatternTable, TableEntry, TableError, parse_table};

/// Default cap on decode input (16 MiB).
pub const DEFAULT_MAX_INPUT_LEN: usize = 16 << 20;

// ---------------------------------------------------------------------------
// Decode options
// ---------------------------------------------------------------------------

/// What to do with decode input longer than `max_input_len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OversizePolicy {
    /// Decode only the first `max_input_len` bytes.
    #[default]
    Truncate,
    /// Refuse the input.
    Reject,
}

/// Configuration for decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Largest input decoded in one pass.
    pub max_input_len: usize,
    pub oversize: OversizePolicy,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_input_len: DEFAULT_MAX_INPUT_LEN,
            oversize: OversizePolicy::Truncate,
        }
    }
}

impl DecodeOptions {
    /// How many bytes of an input of `size` bytes should be decoded, or
    /// `None` if the input must be rejected.
    pub fn read_len(&self, size: u64) -> Option<u64> {
        let limit = self.max_input_len as u64;
        if size <= limit {
            return Some(size);
        }
        match self.oversize {
            OversizePolicy::Truncate => {
                warn!("input is {size} bytes; decoding only the first {limit}");
                Some(limit)
            }
            OversizePolicy::Reject => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// A loaded table, ready to decode and encode.
#[derive(Debug, Clone)]
pub struct Codec {
    decode_table: PatternTable,
    encode_table: PatternTable,
    digest: Fingerprint,
    entries: usize,
}

impl Codec {
    /// Parse `source` and build both pattern orders.
    pub fn from_table(source: &str) -> Result<Self, TableError> {
        let entries = parse_table(source)?;
        Ok(Self::from_entries(&entries))
    }

    pub fn from_entries(entries: &[TableEntry]) -> Self {
        let codec = Self {
            decode_table: PatternTable::build(Direction::Decode, entries),
            encode_table: PatternTable::build(Direction::Encode, entries),
            digest: Fingerprint::of_table(entries),
            entries: entries.len(),
        };
        debug!("table loaded: {} entries, digest {}", codec.entries, codec.digest);
        codec
    }

    /// Digest of the canonical table contents.
    pub fn digest(&self) -> Fingerprint {
        self.digest
    }

    /// Number of entries in the source table.
    pub fn entry_count(&self) -> usize {
        self.entries
    }

    pub fn decode_table(&self) -> &PatternTable {
        &self.decode_table
    }

    pub fn encode_table(&self) -> &PatternTable {
        &self.encode_table
    }

    /// Decode a whole buffer to text.
    pub fn decode(&self, input: &[u8]) -> Result<String, DecodeError> {
        decoder::decode(&self.decode_table, input)
    }

    /// Decode, appending to `out`.
    pub fn decode_into(&self, input: &[u8], out: &mut String) -> Result<DecodeSummary, DecodeError> {
        decoder::decode_into(&self.decode_table, input, out)
    }

    /// Encode a whole text. `cache` is bound to this table first, which
    /// empties it if it was filled under a different table.
    pub fn encode_text(&self, text: &str, cache: &mut LineCache) -> Result<EncodeOutput, EncodeError> {
        cache.bind(self.digest);
        encoder::encode_text(&self.encode_table, text, cache)
    }

    /// Encode a whole text without a persistent cache.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>, EncodeError> {
        let mut cache = LineCache::new();
        self.encode_text(text, &mut cache).map(|o| o.bytes)
    }

    /// Encode a single line, bypassing the cache.
    pub fn encode_line(&self, line: &Line<'_>) -> Result<Vec<u8>, EncodeError> {
        let mut out = Vec::new();
        encoder::encode_line(&self.encode_table, line, &mut out)?;
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
