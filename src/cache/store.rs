// Persisted line-cache store.
//
// Layout:
//   magic "TBLC" | version u8 | bound u8 | [table digest: 32 if bound]
//   entry count (varint)
//   { fingerprint: 32 | length (varint) | bytes } * count
//   adler32 of everything above (4 bytes, big-endian)
//
// Entries are written in fingerprint order so equal caches produce equal
// files. Any structural problem reads as `CacheError::Corrupt`.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use log::{debug, info, warn};
use thiserror::Error;

use super::LineCache;
use super::fingerprint::Fingerprint;
use super::varint;

pub const MAGIC: &[u8; 4] = b"TBLC";
pub const VERSION: u8 = 1;

const CHECKSUM_LEN: usize = 4;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("corrupt cache store: {0}")]
    Corrupt(String),
    #[error("cannot replace cache store: {0}")]
    Persist(#[from] tempfile::PersistError),
}

impl From<varint::VarIntError> for CacheError {
    fn from(e: varint::VarIntError) -> Self {
        Self::Corrupt(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

/// Serialize a cache into the store format.
pub fn to_bytes(cache: &LineCache) -> Vec<u8> {
    let mut out = Vec::with_capacity(64 + cache.len() * 48);
    out.extend_from_slice(MAGIC);
    out.push(VERSION);
    match cache.table() {
        Some(digest) => {
            out.push(1);
            out.extend_from_slice(digest.as_bytes());
        }
        None => out.push(0),
    }

    let mut lines: Vec<(&Fingerprint, &Vec<u8>)> = cache.lines.iter().collect();
    lines.sort_unstable_by_key(|(fp, _)| **fp);

    varint::put_usize(&mut out, lines.len());
    for (fp, bytes) in lines {
        out.extend_from_slice(fp.as_bytes());
        varint::put_usize(&mut out, bytes.len());
        out.extend_from_slice(bytes);
    }

    let checksum = compute_adler32(&out);
    out.extend_from_slice(&checksum.to_be_bytes());
    out
}

/// Parse a store image. Never panics on malformed input.
pub fn from_bytes(data: &[u8]) -> Result<LineCache, CacheError> {
    if data.len() < MAGIC.len() + 2 + CHECKSUM_LEN {
        return Err(corrupt("file too short"));
    }
    let (body, trailer) = data.split_at(data.len() - CHECKSUM_LEN);
    let mut expected = [0u8; CHECKSUM_LEN];
    expected.copy_from_slice(trailer);
    let expected = u32::from_be_bytes(expected);
    let actual = compute_adler32(body);
    if expected != actual {
        return Err(CacheError::Corrupt(format!(
            "checksum mismatch: expected {expected:#010X}, got {actual:#010X}"
        )));
    }

    let mut reader = Reader { data: body, pos: 0 };
    if reader.take(MAGIC.len())? != MAGIC {
        return Err(corrupt("bad magic"));
    }
    let version = reader.byte()?;
    if version != VERSION {
        return Err(CacheError::Corrupt(format!("unsupported version {version}")));
    }
    let table = match reader.byte()? {
        0 => None,
        1 => Some(reader.fingerprint()?),
        _ => return Err(corrupt("bad table flag")),
    };

    let count = reader.varint()?;
    // Each entry needs at least a fingerprint and a length byte.
    if count > reader.remaining() / (Fingerprint::LEN + 1) {
        return Err(corrupt("entry count exceeds file size"));
    }

    let mut lines = HashMap::with_capacity(count);
    for _ in 0..count {
        let fp = reader.fingerprint()?;
        let len = reader.varint()?;
        let bytes = reader.take(len)?.to_vec();
        lines.insert(fp, bytes);
    }
    if reader.remaining() != 0 {
        return Err(corrupt("trailing data"));
    }

    Ok(LineCache {
        table,
        lines,
        modified: false,
    })
}

fn corrupt(msg: &str) -> CacheError {
    CacheError::Corrupt(msg.to_string())
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], CacheError> {
        if len > self.remaining() {
            return Err(corrupt("unexpected end of data"));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn byte(&mut self) -> Result<u8, CacheError> {
        Ok(self.take(1)?[0])
    }

    fn fingerprint(&mut self) -> Result<Fingerprint, CacheError> {
        let mut raw = [0u8; Fingerprint::LEN];
        raw.copy_from_slice(self.take(Fingerprint::LEN)?);
        Ok(Fingerprint::from_bytes(raw))
    }

    fn varint(&mut self) -> Result<usize, CacheError> {
        let (value, len) = varint::take_usize(&self.data[self.pos..])?;
        self.pos += len;
        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// Read a store file. `Ok(None)` when there is no file.
pub fn try_load(path: &Path) -> Result<Option<LineCache>, CacheError> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    from_bytes(&data).map(Some)
}

/// Read a store file, falling back to an empty cache when it is missing,
/// unreadable or corrupt.
pub fn load(path: &Path) -> LineCache {
    match try_load(path) {
        Ok(Some(cache)) => {
            info!("loaded {} cached lines from {}", cache.len(), path.display());
            cache
        }
        Ok(None) => {
            debug!("no line cache at {}", path.display());
            LineCache::new()
        }
        Err(e) => {
            warn!("ignoring line cache {}: {e}", path.display());
            LineCache::new()
        }
    }
}

/// Write the store atomically: a temporary file in the destination
/// directory is renamed over `path`.
pub fn save(cache: &LineCache, path: &Path) -> Result<(), CacheError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&to_bytes(cache))?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    info!("saved {} cached lines to {}", cache.len(), path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Adler-32
// ---------------------------------------------------------------------------

fn compute_adler32(data: &[u8]) -> u32 {
    #[cfg(feature = "adler32")]
    {
        let mut hasher = simd_adler32::Adler32::new();
        hasher.write(data);
        hasher.finish()
    }
    #[cfg(not(feature = "adler32"))]
    {
        const MOD_ADLER: u32 = 65521;
        let mut a: u32 = 1;
        let mut b: u32 = 0;
        for &byte in data {
            a = (a + u32::from(byte)) % MOD_ADLER;
            b = (b + a) % MOD_ADLER;
        }
        (b << 16) | a
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LineCache {
        let mut cache = LineCache::new();
        cache.bind(Fingerprint::from_bytes([7; 32]));
        cache.insert(Fingerprint::of_run("AB", 1, 0), vec![0x41, 0x42, 0x00]);
        cache.insert(Fingerprint::of_run("[X$2A]", 0, 0), vec![0xFE, 0x2A]);
        cache
    }

    #[test]
    fn store_image_reloads() {
        let cache = sample();
        let loaded = from_bytes(&to_bytes(&cache)).unwrap();
        assert_eq!(loaded.table(), cache.table());
        assert_eq!(loaded.len(), 2);
        assert_eq!(
            loaded.lookup(&Fingerprint::of_run("AB", 1, 0)),
            Some(&[0x41, 0x42, 0x00][..])
        );
        assert!(!loaded.is_modified());
    }

    #[test]
    fn image_is_deterministic() {
        assert_eq!(to_bytes(&sample()), to_bytes(&sample()));
    }

    #[test]
    fn unbound_cache_reloads_unbound() {
        let loaded = from_bytes(&to_bytes(&LineCache::new())).unwrap();
        assert!(loaded.table().is_none());
        assert!(loaded.is_empty());
    }

    #[test]
    fn flipped_byte_is_detected() {
        let mut image = to_bytes(&sample());
        let mid = image.len() / 2;
        image[mid] ^= 0x40;
        assert!(matches!(from_bytes(&image), Err(CacheError::Corrupt(_))));
    }

    #[test]
    fn truncation_is_detected() {
        let image = to_bytes(&sample());
        for len in [0, 3, 8, image.len() - 1] {
            assert!(
                matches!(from_bytes(&image[..len]), Err(CacheError::Corrupt(_))),
                "len {len}"
            );
        }
    }

    #[test]
    fn bad_magic_is_detected() {
        let mut image = to_bytes(&sample());
        image[0] = b'X';
        let body_len = image.len() - CHECKSUM_LEN;
        let checksum = compute_adler32(&image[..body_len]);
        image[body_len..].copy_from_slice(&checksum.to_be_bytes());
        let err = from_bytes(&image).unwrap_err();
        assert_eq!(err.to_string(), "corrupt cache store: bad magic");
    }

    #[test]
    fn adler32_known_vector() {
        assert_eq!(compute_adler32(b"Wikipedia"), 0x11E6_0398);
    }
}
