// Line cache for the encode direction.
//
// Maps a line-run fingerprint to the bytes last produced for that run, so
// unchanged lines skip matching on the next run. The cache is
// bound to the digest of the table it was filled with; binding it to a
// different table empties it, so stale bytes are never reused.
//
// - `fingerprint`: SHA-256 line-run fingerprints and table digests
// - `store`: persisted file format, load/save
// - `varint`: integer coding used by the store

pub mod fingerprint;
pub mod store;
pub mod varint;

use std::collections::HashMap;
use std::path::Path;

use log::warn;

pub use fingerprint::Fingerprint;
pub use store::CacheError;

/// In-memory line cache, owned by the caller of the encoder.
#[derive(Debug, Clone, Default)]
pub struct LineCache {
    table: Option<Fingerprint>,
    lines: HashMap<Fingerprint, Vec<u8>>,
    modified: bool,
}

impl LineCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `path`; a missing, unreadable or corrupt store gives an
    /// empty cache.
    pub fn load(path: &Path) -> Self {
        store::load(path)
    }

    /// Atomically replace the store at `path` with this cache.
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        store::save(self, path)
    }

    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<&[u8]> {
        self.lines.get(fingerprint).map(Vec::as_slice)
    }

    pub fn insert(&mut self, fingerprint: Fingerprint, bytes: Vec<u8>) {
        self.lines.insert(fingerprint, bytes);
        self.modified = true;
    }

    /// Digest of the table the cached bytes were produced with.
    pub fn table(&self) -> Option<Fingerprint> {
        self.table
    }

    /// Bind the cache to `table`. Entries produced under any other table,
    /// or under no recorded table, are dropped. Returns `true` if entries
    /// were dropped.
    pub fn bind(&mut self, table: Fingerprint) -> bool {
        if self.table == Some(table) {
            return false;
        }
        let dropped = !self.lines.is_empty();
        if dropped {
            warn!(
                "line cache was built with a different table; discarding {} entries",
                self.lines.len()
            );
            self.lines.clear();
        }
        self.table = Some(table);
        self.modified = true;
        dropped
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Whether the cache changed since it was created or loaded.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn clear(&mut self) {
        if !self.lines.is_empty() {
            self.modified = true;
        }
        self.lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_after_insert() {
        let mut cache = LineCache::new();
        let fp = Fingerprint::of_run("AB", 0, 0);
        assert!(cache.lookup(&fp).is_none());
        cache.insert(fp, vec![0x41, 0x42]);
        assert_eq!(cache.lookup(&fp), Some(&[0x41, 0x42][..]));
        assert!(cache.is_modified());
    }

    #[test]
    fn rebinding_to_same_table_keeps_entries() {
        let table = Fingerprint::from_bytes([1; 32]);
        let mut cache = LineCache::new();
        cache.bind(table);
        cache.insert(Fingerprint::of_run("A", 0, 0), vec![0x41]);
        assert!(!cache.bind(table));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn binding_to_other_table_drops_entries() {
        let mut cache = LineCache::new();
        cache.bind(Fingerprint::from_bytes([1; 32]));
        cache.insert(Fingerprint::of_run("A", 0, 0), vec![0x41]);

        assert!(cache.bind(Fingerprint::from_bytes([2; 32])));
        assert!(cache.is_empty());
        assert_eq!(cache.table(), Some(Fingerprint::from_bytes([2; 32])));
    }

    #[test]
    fn unbound_entries_are_dropped_on_bind() {
        let mut cache = LineCache::new();
        cache.insert(Fingerprint::of_run("A", 0, 0), vec![0x41]);
        assert!(cache.bind(Fingerprint::from_bytes([3; 32])));
        assert!(cache.is_empty());
    }
}
