// Scanning engines.
//
// - `decoder`: bytes -> text, first-match over the decode-ordered table
// - `encoder`: text lines -> bytes, first-match over the encode-ordered
//   table, with the line cache in front

pub mod decoder;
pub mod encoder;

pub use decoder::{DecodeError, DecodeSummary};
pub use encoder::{EncodeError, EncodeOutput, Line, LineRun, line_runs, split_lines};
