// File-level helpers for decoding and encoding.
//
// Wraps the in-memory `Codec` with the file handling the command line
// needs: table loading, capped binary reads, buffered output with a
// streaming SHA-256, and stats for reporting.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use sha2::Digest;
use thiserror::Error;

use crate::cache::{CacheError, LineCache};
use crate::codec::{DecodeError, EncodeError};
use crate::engine::{Codec, DecodeOptions};
use crate::table::TableError;

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `decode_file()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeStats {
    /// Input file size in bytes.
    pub input_size: u64,
    /// Bytes actually decoded (input size minus truncation).
    pub decoded_size: u64,
    /// Bytes past the input limit that were left out.
    pub truncated_bytes: u64,
    /// Table entries emitted.
    pub entries_matched: u64,
    /// Text output size in bytes.
    pub output_size: u64,
    /// SHA-256 of the text output.
    pub output_sha256: [u8; 32],
}

/// Statistics returned by `encode_file()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeStats {
    /// Lines in the input text.
    pub lines: u64,
    /// Lines matched against the table (new or changed since the cache was
    /// filled).
    pub fresh_lines: u64,
    /// Lines served from the line cache.
    pub cached_lines: u64,
    /// Binary output size in bytes.
    pub output_size: u64,
    /// SHA-256 of the binary output.
    pub output_sha256: [u8; 32],
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for file operations.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("file not found: {}", .path.display())]
    FileNotFound { path: PathBuf },
    #[error("cannot read {}: {source}", .path.display())]
    FileUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot write {}: {source}", .path.display())]
    FileUnwritable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} is {size} bytes, over the {limit} byte input limit", .path.display())]
    InputTooLarge { path: PathBuf, size: u64, limit: u64 },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl IoError {
    fn reading(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            Self::FileUnreadable {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    fn writing(path: &Path, source: io::Error) -> Self {
        Self::FileUnwritable {
            path: path.to_path_buf(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// Default buffer size
// ---------------------------------------------------------------------------

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// Read and parse a table file.
pub fn load_codec(table_path: &Path) -> Result<Codec, IoError> {
    let source = read_text(table_path)?;
    let codec = Codec::from_table(&source)?;
    debug!(
        "{}: {} entries",
        table_path.display(),
        codec.entry_count()
    );
    Ok(codec)
}

/// Read a UTF-8 text file, dropping a leading byte-order mark.
fn read_text(path: &Path) -> Result<String, IoError> {
    let mut text = fs::read_to_string(path).map_err(|e| IoError::reading(path, e))?;
    if text.starts_with('\u{feff}') {
        text.replace_range(..'\u{feff}'.len_utf8(), "");
    }
    Ok(text)
}

// ---------------------------------------------------------------------------
// decode_file
// ---------------------------------------------------------------------------

/// Decode a binary file to a text file.
///
/// At most `opts.max_input_len` bytes are read; larger inputs are truncated
/// or rejected per `opts.oversize`. The output file is only created once
/// decoding has succeeded.
pub fn decode_file(
    codec: &Codec,
    input_path: &Path,
    output_path: &Path,
    opts: &DecodeOptions,
) -> Result<DecodeStats, IoError> {
    let input_file = File::open(input_path).map_err(|e| IoError::reading(input_path, e))?;
    let input_size = input_file
        .metadata()
        .map_err(|e| IoError::reading(input_path, e))?
        .len();

    let read_len = opts
        .read_len(input_size)
        .ok_or_else(|| IoError::InputTooLarge {
            path: input_path.to_path_buf(),
            size: input_size,
            limit: opts.max_input_len as u64,
        })?;

    let mut input = Vec::with_capacity(usize::try_from(read_len).unwrap_or(0));
    BufReader::with_capacity(BUF_SIZE, input_file)
        .take(read_len)
        .read_to_end(&mut input)
        .map_err(|e| IoError::reading(input_path, e))?;
    let decoded_size = input.len() as u64;

    let mut text = String::with_capacity(input.len() * 2);
    let summary = codec.decode_into(&input, &mut text)?;

    let (output_size, output_sha256) = write_output(output_path, text.as_bytes())?;

    Ok(DecodeStats {
        input_size,
        decoded_size,
        truncated_bytes: input_size.saturating_sub(decoded_size),
        entries_matched: summary.entries_matched as u64,
        output_size,
        output_sha256,
    })
}

// ---------------------------------------------------------------------------
// encode_file
// ---------------------------------------------------------------------------

/// Encode a text file to a binary file, using and extending `cache`.
///
/// The cache is bound to `codec`'s table before use; persisting it is left
/// to the caller.
pub fn encode_file(
    codec: &Codec,
    input_path: &Path,
    output_path: &Path,
    cache: &mut LineCache,
) -> Result<EncodeStats, IoError> {
    let text = read_text(input_path)?;
    let encoded = codec.encode_text(&text, cache)?;
    let (output_size, output_sha256) = write_output(output_path, &encoded.bytes)?;

    Ok(EncodeStats {
        lines: encoded.lines as u64,
        fresh_lines: encoded.fresh_lines as u64,
        cached_lines: encoded.cached_lines as u64,
        output_size,
        output_sha256,
    })
}

/// Load the line cache at `path`, or an empty one when `path` is `None`.
pub fn load_cache(path: Option<&Path>) -> LineCache {
    path.map(LineCache::load).unwrap_or_default()
}

/// Save the line cache if it changed. A failure is logged, not returned;
/// the result says whether the store on disk matches `cache`.
pub fn store_cache(cache: &LineCache, path: &Path) -> bool {
    if !cache.is_modified() {
        debug!("line cache unchanged; not saving");
        return true;
    }
    match cache.save(path) {
        Ok(()) => true,
        Err(e) => {
            warn!("could not save line cache to {}: {e}", path.display());
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn write_output(path: &Path, data: &[u8]) -> Result<(u64, [u8; 32]), IoError> {
    let file = File::create(path).map_err(|e| IoError::writing(path, e))?;
    let mut writer = BufWriter::with_capacity(BUF_SIZE, file);
    let mut hasher = sha2::Sha256::new();

    let mut hashing = HashingWriter {
        inner: &mut writer,
        hasher: &mut hasher,
    };
    hashing
        .write_all(data)
        .map_err(|e| IoError::writing(path, e))?;
    hashing.flush().map_err(|e| IoError::writing(path, e))?;

    Ok((data.len() as u64, hasher.finalize().into()))
}

// ---------------------------------------------------------------------------
// Hashing writer
// ---------------------------------------------------------------------------

struct HashingWriter<'a, W: Write> {
    inner: &'a mut W,
    hasher: &'a mut sha2::Sha256,
}

impl<W: Write> Write for HashingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
