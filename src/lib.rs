//! tblcodec: table-driven binary/text codec.
//!
//! A translation table maps byte sequences (with `%%` wildcards) to text.
//! Decoding turns a binary script into editable text; encoding turns the
//! edited text back into bytes, reusing a persistent line cache for lines
//! that did not change.
//!
//! The crate provides:
//! - Table parsing and per-direction ordering (`table`)
//! - The decode and encode scanners (`codec`)
//! - The line cache and its on-disk store (`cache`)
//! - A two-direction facade over one table (`engine`)
//! - File-oriented helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```
//! use tblcodec::engine::Codec;
//!
//! let codec = Codec::from_table("41=A\n42=B\n00=\\\nFE%%=[X$%%]\n").unwrap();
//!
//! let text = codec.decode(&[0x41, 0x42, 0x00, 0xFE, 0x2A]).unwrap();
//! assert_eq!(text, "AB\n[X$2A]");
//!
//! let bytes = codec.encode(&text).unwrap();
//! assert_eq!(bytes, [0x41, 0x42, 0x00, 0xFE, 0x2A]);
//! ```

pub mod cache;
pub mod codec;
pub mod engine;
pub mod io;
pub mod table;

#[cfg(feature = "cli")]
pub mod cli;
