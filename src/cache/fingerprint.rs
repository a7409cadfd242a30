// Content fingerprints (SHA-256).
//
// Line-run fingerprints key the line cache; the table digest binds a cache
// to the table that produced its bytes.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::table::TableEntry;

/// Domain prefix for table digests.
const TABLE_DOMAIN: &[u8] = b"tblcodec:table:v1\n";

/// A 256-bit content hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub const LEN: usize = 32;

    #[inline]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Fingerprint of one line run: the terminator count and the number of
    /// those claimed by the next line, both as fixed-width integers, then
    /// the line content.
    pub fn of_run(content: &str, breaks: usize, absorbed: usize) -> Self {
        let mut hasher = Sha256::new();
        hasher.update((breaks as u64).to_be_bytes());
        hasher.update((absorbed as u64).to_be_bytes());
        hasher.update(content.as_bytes());
        Self(hasher.finalize().into())
    }

    /// Digest of a parsed table: every entry in canonical form, in source
    /// order. Comments, blank lines and hex case do not affect it.
    pub fn of_table(entries: &[TableEntry]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(TABLE_DOMAIN);
        for entry in entries {
            hasher.update(entry.to_string().as_bytes());
            hasher.update(b"\n");
        }
        Self(hasher.finalize().into())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}
